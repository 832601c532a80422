use crate::host::NativeMidi;
use midiport_types::errors::EndpointError;
use midiport_types::handle::{NativeHandle, RawRef};

pub(crate) struct ScopedString<'a> {
    host: &'a dyn NativeMidi,
    handle: NativeHandle,
}

impl<'a> ScopedString<'a> {
    pub(crate) fn create(host: &'a dyn NativeMidi, value: &str) -> Result<Self, EndpointError> {
        let raw = host.create_string(value)?;
        Ok(Self::adopt(host, raw))
    }

    pub(crate) fn adopt(host: &'a dyn NativeMidi, raw: RawRef) -> Self {
        Self {
            host,
            handle: NativeHandle::owned(raw),
        }
    }

    pub(crate) fn raw(&self) -> RawRef {
        self.handle.raw()
    }

    pub(crate) fn is_null(&self) -> bool {
        self.handle.is_null()
    }
}

impl Drop for ScopedString<'_> {
    fn drop(&mut self) {
        if self.handle.needs_release() {
            self.host.release(self.handle.raw());
        }
    }
}

pub fn get_string_property(host: &dyn NativeMidi, object: RawRef, key: &str) -> Option<String> {
    match read_string_property(host, object, key) {
        Ok(value) => Some(value),
        Err(err) => {
            log::debug!("get_string_property(): {err} on object {object:?}");
            None
        }
    }
}

pub fn get_int_property(host: &dyn NativeMidi, object: RawRef, key: &str) -> Option<i32> {
    match read_int_property(host, object, key) {
        Ok(value) => Some(value),
        Err(err) => {
            log::debug!("get_int_property(): {err} on object {object:?}");
            None
        }
    }
}

fn read_string_property(
    host: &dyn NativeMidi,
    object: RawRef,
    key: &str,
) -> Result<String, EndpointError> {
    let property = ScopedString::create(host, key)?;

    let (status, string) = host.string_property(object, property.raw());
    let string = ScopedString::adopt(host, string);

    if !status.is_ok() || string.is_null() {
        return Err(unavailable(key));
    }

    let length = host.string_length(string.raw());
    let max_size = host.max_size_for_encoding(length);
    if length < 0 || max_size < 0 {
        return Err(unavailable(key));
    }

    let mut buffer = vec![0u8; max_size as usize + 1];
    if !host.copy_c_string(string.raw(), &mut buffer) {
        return Err(unavailable(key));
    }

    let terminator = buffer.iter().position(|&byte| byte == 0).unwrap_or(buffer.len());
    buffer.truncate(terminator);

    String::from_utf8(buffer).map_err(|_| unavailable(key))
}

fn read_int_property(host: &dyn NativeMidi, object: RawRef, key: &str) -> Result<i32, EndpointError> {
    let property = ScopedString::create(host, key)?;

    let (status, value) = host.integer_property(object, property.raw());
    if !status.is_ok() {
        return Err(unavailable(key));
    }

    Ok(value)
}

fn unavailable(key: &str) -> EndpointError {
    EndpointError::PropertyUnavailable {
        key: key.to_string(),
    }
}
