#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawRef(usize);

impl RawRef {
    pub const NULL: RawRef = RawRef(0);

    pub const fn new(value: usize) -> Self {
        Self(value)
    }

    pub const fn as_usize(self) -> usize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owned,
    Borrowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeHandle {
    raw: RawRef,
    ownership: Ownership,
}

impl NativeHandle {
    pub const fn owned(raw: RawRef) -> Self {
        Self {
            raw,
            ownership: Ownership::Owned,
        }
    }

    pub const fn borrowed(raw: RawRef) -> Self {
        Self {
            raw,
            ownership: Ownership::Borrowed,
        }
    }

    pub const fn null() -> Self {
        Self::borrowed(RawRef::NULL)
    }

    pub fn raw(&self) -> RawRef {
        self.raw
    }

    pub fn is_null(&self) -> bool {
        self.raw.is_null()
    }

    pub fn needs_release(&self) -> bool {
        self.ownership == Ownership::Owned && !self.raw.is_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle_never_needs_release() {
        assert!(NativeHandle::null().is_null());
        assert!(!NativeHandle::null().needs_release());
        assert!(!NativeHandle::owned(RawRef::NULL).needs_release());
    }

    #[test]
    fn only_owned_non_null_handles_need_release() {
        assert!(NativeHandle::owned(RawRef::new(7)).needs_release());
        assert!(!NativeHandle::borrowed(RawRef::new(7)).needs_release());
    }

    #[test]
    fn raw_ref_round_trips_its_value() {
        let raw = RawRef::new(0xBEEF);
        assert_eq!(raw.as_usize(), 0xBEEF);
        assert!(!raw.is_null());
        assert_eq!(RawRef::default(), RawRef::NULL);
    }
}
