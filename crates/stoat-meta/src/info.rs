//! Per-type metadata records.

use stoat_identity::NameId;

use crate::type_id::TypeId;

/// Metadata for one registered type.
///
/// `bases` is the transitive base set: bit `i` is set iff type `i` is
/// inherited, directly or through another base. A type is never its own base.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub id: TypeId,
    pub name: NameId,
    pub size: usize,
    pub align: usize,
    bases: Vec<bool>,
    num_bases: usize,
}

impl TypeInfo {
    pub(crate) fn new(id: TypeId, name: NameId, size: usize, align: usize) -> Self {
        Self {
            id,
            name,
            size,
            align,
            bases: Vec::new(),
            num_bases: 0,
        }
    }

    pub fn has_base(&self, ty: TypeId) -> bool {
        ty.is_valid() && self.bases.get(ty.to_usize()).copied().unwrap_or(false)
    }

    pub fn num_bases(&self) -> usize {
        self.num_bases
    }

    pub fn bases(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.bases
            .iter()
            .enumerate()
            .filter(|&(_, &set)| set)
            .map(|(i, _)| TypeId::new(i as i32))
    }

    /// Element stride for pool and heap buffers: size rounded up to align.
    pub fn stride(&self) -> usize {
        self.size.next_multiple_of(self.align)
    }

    /// Set a base bit, returning true iff it transitioned 0 -> 1.
    pub(crate) fn set_base(&mut self, ty: TypeId) -> bool {
        debug_assert!(ty.is_valid());
        debug_assert_ne!(ty, self.id, "a type is not its own base");
        let index = ty.to_usize();
        if index >= self.bases.len() {
            self.bases.resize(index + 1, false);
        }
        if self.bases[index] {
            return false;
        }
        self.bases[index] = true;
        self.num_bases += 1;
        true
    }
}
