//! Vendor math-library handle bundle.
//!
//! One owned handle per library: cuBLAS (dense algebra), cuSOLVER-Dn
//! (dense direct solvers), cuSOLVER-Sp (sparse direct solvers) and
//! cuSPARSE (sparse algebra). All four are created eagerly when the
//! context is built, so resource exhaustion surfaces at construction
//! instead of deep inside an algorithm, and every handle is bound to the
//! primary stream. Replacing the primary stream must go through
//! [`LibraryBundle::rebind`]; a handle left on a stale stream is a
//! correctness bug, not a performance issue.

use cudarc::cublas::{result as cublas_result, sys as cublas_sys};
use cudarc::cusolver::sys as cusolver_sys;
use cudarc::cusparse::sys as cusparse_sys;
use cudarc::driver::sys as cuda_sys;
use cudarc::driver::CudaStream;

use gpuctx_core::error::{ResourceError, Result};

/// Owned cuBLAS handle.
pub struct CublasHandle {
    raw: cublas_sys::cublasHandle_t,
}

impl CublasHandle {
    fn new(stream: cuda_sys::CUstream) -> Result<Self> {
        let raw = cublas_result::create_handle().map_err(|e| {
            ResourceError::Construction(format!("cublas handle creation failed: {e:?}"))
        })?;
        let handle = Self { raw };
        handle.set_stream(stream)?;
        Ok(handle)
    }

    fn set_stream(&self, stream: cuda_sys::CUstream) -> Result<()> {
        // Safety: the handle is alive and the stream belongs to the
        // owning context.
        unsafe { cublas_result::set_stream(self.raw, stream as cublas_sys::cudaStream_t) }
            .map_err(|e| ResourceError::DeviceRuntime(format!("cublas set stream failed: {e:?}")))
    }

    /// Raw handle for passing to cuBLAS calls.
    ///
    /// # Safety
    ///
    /// Must not outlive the bundle that owns it.
    #[must_use]
    pub unsafe fn raw(&self) -> cublas_sys::cublasHandle_t {
        self.raw
    }
}

impl Drop for CublasHandle {
    fn drop(&mut self) {
        // Safety: we own the handle.
        unsafe {
            let _ = cublas_result::destroy_handle(self.raw);
        }
    }
}

unsafe impl Send for CublasHandle {}
unsafe impl Sync for CublasHandle {}

/// Owned cuSOLVER dense handle.
pub struct CusolverDnHandle {
    raw: cusolver_sys::cusolverDnHandle_t,
}

impl CusolverDnHandle {
    fn new(stream: cuda_sys::CUstream) -> Result<Self> {
        let mut raw = std::ptr::null_mut();
        // Safety: raw is a valid out-pointer.
        let status = unsafe { cusolver_sys::cusolverDnCreate(&mut raw) };
        if status != cusolver_sys::cusolverStatus_t::CUSOLVER_STATUS_SUCCESS {
            return Err(ResourceError::Construction(format!(
                "cusolverDn handle creation failed: {status:?}"
            )));
        }
        let handle = Self { raw };
        handle.set_stream(stream)?;
        Ok(handle)
    }

    fn set_stream(&self, stream: cuda_sys::CUstream) -> Result<()> {
        // Safety: handle and stream are alive in the owning context.
        let status =
            unsafe { cusolver_sys::cusolverDnSetStream(self.raw, stream as *mut _) };
        if status != cusolver_sys::cusolverStatus_t::CUSOLVER_STATUS_SUCCESS {
            return Err(ResourceError::DeviceRuntime(format!(
                "cusolverDn set stream failed: {status:?}"
            )));
        }
        Ok(())
    }

    /// Raw handle for passing to cuSOLVER dense calls.
    ///
    /// # Safety
    ///
    /// Must not outlive the bundle that owns it.
    #[must_use]
    pub unsafe fn raw(&self) -> cusolver_sys::cusolverDnHandle_t {
        self.raw
    }
}

impl Drop for CusolverDnHandle {
    fn drop(&mut self) {
        // Safety: we own the handle.
        unsafe {
            let _ = cusolver_sys::cusolverDnDestroy(self.raw);
        }
    }
}

unsafe impl Send for CusolverDnHandle {}
unsafe impl Sync for CusolverDnHandle {}

/// Owned cuSOLVER sparse handle.
pub struct CusolverSpHandle {
    raw: cusolver_sys::cusolverSpHandle_t,
}

impl CusolverSpHandle {
    fn new(stream: cuda_sys::CUstream) -> Result<Self> {
        let mut raw = std::ptr::null_mut();
        // Safety: raw is a valid out-pointer.
        let status = unsafe { cusolver_sys::cusolverSpCreate(&mut raw) };
        if status != cusolver_sys::cusolverStatus_t::CUSOLVER_STATUS_SUCCESS {
            return Err(ResourceError::Construction(format!(
                "cusolverSp handle creation failed: {status:?}"
            )));
        }
        let handle = Self { raw };
        handle.set_stream(stream)?;
        Ok(handle)
    }

    fn set_stream(&self, stream: cuda_sys::CUstream) -> Result<()> {
        // Safety: handle and stream are alive in the owning context.
        let status =
            unsafe { cusolver_sys::cusolverSpSetStream(self.raw, stream as *mut _) };
        if status != cusolver_sys::cusolverStatus_t::CUSOLVER_STATUS_SUCCESS {
            return Err(ResourceError::DeviceRuntime(format!(
                "cusolverSp set stream failed: {status:?}"
            )));
        }
        Ok(())
    }

    /// Raw handle for passing to cuSOLVER sparse calls.
    ///
    /// # Safety
    ///
    /// Must not outlive the bundle that owns it.
    #[must_use]
    pub unsafe fn raw(&self) -> cusolver_sys::cusolverSpHandle_t {
        self.raw
    }
}

impl Drop for CusolverSpHandle {
    fn drop(&mut self) {
        // Safety: we own the handle.
        unsafe {
            let _ = cusolver_sys::cusolverSpDestroy(self.raw);
        }
    }
}

unsafe impl Send for CusolverSpHandle {}
unsafe impl Sync for CusolverSpHandle {}

/// Owned cuSPARSE handle.
pub struct CusparseHandle {
    raw: cusparse_sys::cusparseHandle_t,
}

impl CusparseHandle {
    fn new(stream: cuda_sys::CUstream) -> Result<Self> {
        let mut raw = std::ptr::null_mut();
        // Safety: raw is a valid out-pointer.
        let status = unsafe { cusparse_sys::cusparseCreate(&mut raw) };
        if status != cusparse_sys::cusparseStatus_t::CUSPARSE_STATUS_SUCCESS {
            return Err(ResourceError::Construction(format!(
                "cusparse handle creation failed: {status:?}"
            )));
        }
        let handle = Self { raw };
        handle.set_stream(stream)?;
        Ok(handle)
    }

    fn set_stream(&self, stream: cuda_sys::CUstream) -> Result<()> {
        // Safety: handle and stream are alive in the owning context.
        let status =
            unsafe { cusparse_sys::cusparseSetStream(self.raw, stream as *mut _) };
        if status != cusparse_sys::cusparseStatus_t::CUSPARSE_STATUS_SUCCESS {
            return Err(ResourceError::DeviceRuntime(format!(
                "cusparse set stream failed: {status:?}"
            )));
        }
        Ok(())
    }

    /// Raw handle for passing to cuSPARSE calls.
    ///
    /// # Safety
    ///
    /// Must not outlive the bundle that owns it.
    #[must_use]
    pub unsafe fn raw(&self) -> cusparse_sys::cusparseHandle_t {
        self.raw
    }
}

impl Drop for CusparseHandle {
    fn drop(&mut self) {
        // Safety: we own the handle.
        unsafe {
            let _ = cusparse_sys::cusparseDestroy(self.raw);
        }
    }
}

unsafe impl Send for CusparseHandle {}
unsafe impl Sync for CusparseHandle {}

/// The four vendor handles of one context, all bound to the same stream.
pub struct LibraryBundle {
    cublas: CublasHandle,
    cusolver_dn: CusolverDnHandle,
    cusolver_sp: CusolverSpHandle,
    cusparse: CusparseHandle,
}

impl LibraryBundle {
    /// Create all four handles, bound to `stream`.
    ///
    /// Any single failure aborts the whole bundle; a context is unusable
    /// without its library handles.
    pub fn new(stream: &CudaStream) -> Result<Self> {
        let raw = stream.cu_stream();
        let bundle = Self {
            cublas: CublasHandle::new(raw)?,
            cusolver_dn: CusolverDnHandle::new(raw)?,
            cusolver_sp: CusolverSpHandle::new(raw)?,
            cusparse: CusparseHandle::new(raw)?,
        };
        tracing::debug!("created vendor library handle bundle");
        Ok(bundle)
    }

    /// Re-associate every handle with `stream`.
    pub fn rebind(&self, stream: &CudaStream) -> Result<()> {
        let raw = stream.cu_stream();
        self.cublas.set_stream(raw)?;
        self.cusolver_dn.set_stream(raw)?;
        self.cusolver_sp.set_stream(raw)?;
        self.cusparse.set_stream(raw)?;
        Ok(())
    }

    /// The cuBLAS handle.
    #[must_use]
    pub fn cublas(&self) -> &CublasHandle {
        &self.cublas
    }

    /// The cuSOLVER dense handle.
    #[must_use]
    pub fn cusolver_dn(&self) -> &CusolverDnHandle {
        &self.cusolver_dn
    }

    /// The cuSOLVER sparse handle.
    #[must_use]
    pub fn cusolver_sp(&self) -> &CusolverSpHandle {
        &self.cusolver_sp
    }

    /// The cuSPARSE handle.
    #[must_use]
    pub fn cusparse(&self) -> &CusparseHandle {
        &self.cusparse
    }
}
