use std::fs::{File, OpenOptions};
use std::os::windows::fs::OpenOptionsExt;
use std::os::windows::io::AsRawHandle;
use std::path::PathBuf;

use tracing::debug;
use windows_sys::Win32::Foundation::ERROR_NOT_FOUND;
use windows_sys::Win32::System::Pipes::PeekNamedPipe;
use windows_sys::Win32::System::IO::CancelIoEx;

use crate::error::{Result, TransportError};
use crate::stream::IpcStream;

/// Open the client end of a named pipe (`\\.\pipe\<name>`), exclusive access.
pub(crate) fn connect(name: &str) -> Result<IpcStream> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .share_mode(0)
        .open(name)
        .map_err(|source| TransportError::Connect {
            path: PathBuf::from(name),
            source,
        })?;
    debug!(pipe = name, "connected to companion pipe");
    Ok(IpcStream::from_pipe(file))
}

/// Bytes the companion has written that are waiting in the pipe.
///
/// Fails once the companion has closed its end.
pub(crate) fn bytes_available(file: &File) -> std::io::Result<usize> {
    let mut available: u32 = 0;
    // SAFETY: the handle is an open pipe handle owned by `file`; a null buffer
    // with size 0 only queries counts, and `available` is a valid out pointer.
    let ok = unsafe {
        PeekNamedPipe(
            file.as_raw_handle() as _,
            std::ptr::null_mut(),
            0,
            std::ptr::null_mut(),
            &mut available,
            std::ptr::null_mut(),
        )
    };
    if ok == 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(available as usize)
    }
}

/// Cancel every read or write pending on the pipe handle, from any thread.
pub(crate) fn cancel_pending_io(file: &File) -> std::io::Result<()> {
    // SAFETY: the handle is an open pipe handle owned by `file`; a null
    // OVERLAPPED pointer asks for every pending request to be cancelled.
    let ok = unsafe { CancelIoEx(file.as_raw_handle() as _, std::ptr::null()) };
    if ok != 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(ERROR_NOT_FOUND as i32) {
        // Nothing was in flight.
        return Ok(());
    }
    Err(err)
}
