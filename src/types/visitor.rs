use super::{FloatWidth, FuncType, IntWidth, InterfaceType, StructType, TypeKind, TypeRef, UintWidth};

/// Visitor over type kinds, one callback per kind.
///
/// `TypeDescriptor::accept` matches exhaustively, so adding a kind is a
/// compile error in every visitor until it is handled.
pub trait TypeVisitor {
    type Output;

    fn visit_bool(&mut self) -> Self::Output;
    fn visit_int(&mut self, width: IntWidth) -> Self::Output;
    fn visit_uint(&mut self, width: UintWidth) -> Self::Output;
    fn visit_float(&mut self, width: FloatWidth) -> Self::Output;
    fn visit_string(&mut self) -> Self::Output;
    fn visit_array(&mut self, elem: &TypeRef, len: usize) -> Self::Output;
    fn visit_slice(&mut self, elem: &TypeRef) -> Self::Output;
    fn visit_map(&mut self, key: &TypeRef, value: &TypeRef) -> Self::Output;
    fn visit_pointer(&mut self, elem: &TypeRef) -> Self::Output;
    fn visit_interface(&mut self, iface: &InterfaceType) -> Self::Output;
    fn visit_struct(&mut self, st: &StructType) -> Self::Output;
    fn visit_func(&mut self, sig: &FuncType) -> Self::Output;
    fn visit_unsafe_pointer(&mut self) -> Self::Output;
    fn visit_handle(&mut self) -> Self::Output;

    /// Kinds outside the conversion surface: complex numbers and channels
    fn visit_unsupported(&mut self, kind: &TypeKind) -> Self::Output;
}
