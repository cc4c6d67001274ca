//! Utility functions and helper types.

/// Unqualified name of a type, without its module path or generic
/// arguments: `String` for `alloc::string::String`, `Vec` for `Vec<u8>`.
pub fn type_tag<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::").next().unwrap_or(path)
}
