//! The type registry: dense ids, per-type metadata, and operation tables.
//!
//! One `Registry` owns the interned name table, the `TypeInfo` records, and
//! every operation table. A thread-local default instance is created on first
//! touch and bootstraps the primitives plus the `View` and `Handle` records;
//! [`with`] reaches it.

use std::cell::RefCell;
use std::fmt::{self};

use rustc_hash::FxHashMap;
use stoat_identity::Interner;

use crate::errors::MetaError;
use crate::handle::Handle;
use crate::info::TypeInfo;
use crate::ops::{
    AssignerFn, BinaryFn, BinaryOp, CasterFn, ConstructorFn, ConverterFn, DestructorFn, UnaryFn,
    UnaryOp,
};
use crate::reflect::{add_pod, add_primitive_float, add_primitive_integral, install_bool_ops};
use crate::signature::Signature;
use crate::type_id::{Primitive, TypeId};
use crate::view::View;

/// Ceiling on registered type count.
const MAX_TYPES: usize = i32::MAX as usize;

/// Default alignment for types registered by name only.
pub const DEFAULT_ALIGN: usize = 16;

/// Per-type operation tables plus type metadata.
pub struct Registry {
    names: Interner,
    types_by_name: FxHashMap<stoat_identity::NameId, TypeId>,
    infos: Vec<TypeInfo>,

    ctors: Vec<FxHashMap<Signature, ConstructorFn>>,
    dtors: Vec<Option<DestructorFn>>,
    assigners: Vec<FxHashMap<Signature, AssignerFn>>,
    unary: Vec<[FxHashMap<Signature, UnaryFn>; UnaryOp::COUNT]>,
    binary: Vec<[FxHashMap<Signature, BinaryFn>; BinaryOp::COUNT]>,
    casters: Vec<Vec<Option<CasterFn>>>,
    converters: Vec<Vec<Option<ConverterFn>>>,
}

impl Registry {
    /// A registry with the primitives, `View`, and `Handle` installed.
    pub fn new() -> Self {
        let mut registry = Self::bare();
        registry.bootstrap();
        registry
    }

    /// A registry with no types at all. Exposed for tests that need to watch
    /// the bootstrap happen; `new` is the normal entry point.
    pub fn bare() -> Self {
        Self {
            names: Interner::new(),
            types_by_name: FxHashMap::default(),
            infos: Vec::new(),
            ctors: Vec::new(),
            dtors: Vec::new(),
            assigners: Vec::new(),
            unary: Vec::new(),
            binary: Vec::new(),
            casters: Vec::new(),
            converters: Vec::new(),
        }
    }

    fn bootstrap(&mut self) {
        // Registration order assigns the primitives the dense ids their
        // inline tags normalize to; see Primitive::type_id.
        let ok = add_primitive_integral::<u8>(self)
            && add_primitive_integral::<u16>(self)
            && add_primitive_integral::<u32>(self)
            && add_primitive_integral::<u64>(self)
            && add_primitive_integral::<i8>(self)
            && add_primitive_integral::<i16>(self)
            && add_primitive_integral::<i32>(self)
            && add_primitive_integral::<i64>(self)
            && add_primitive_float::<f32>(self)
            && add_primitive_float::<f64>(self)
            && install_bool_ops(self)
            && add_pod::<View>(self)
            && add_pod::<Handle>(self);
        assert!(ok, "meta bootstrap failed");

        for prim in Primitive::ALL {
            debug_assert_eq!(self.find(prim.name()), prim.type_id());
        }
        tracing::debug!(types = self.infos.len(), "registry bootstrapped");
    }

    /// Register a type by name, size, and alignment. Idempotent: a second
    /// call with an equal name returns the prior id unchanged.
    pub fn register(&mut self, name: &str, size: usize, align: usize) -> TypeId {
        let name_id = self.names.intern(name);
        if let Some(&ty) = self.types_by_name.get(&name_id) {
            return ty;
        }

        assert!(size > 0, "registered type '{name}' must have nonzero size");
        assert!(
            align.is_power_of_two(),
            "registered type '{name}' must have power-of-two alignment"
        );
        assert!(self.infos.len() < MAX_TYPES, "type registry is full");

        let ty = TypeId::new(self.infos.len() as i32);
        self.infos.push(TypeInfo::new(ty, name_id, size, align));
        self.types_by_name.insert(name_id, ty);

        self.ctors.push(FxHashMap::default());
        self.dtors.push(None);
        self.assigners.push(FxHashMap::default());
        self.unary.push(std::array::from_fn(|_| FxHashMap::default()));
        self.binary.push(std::array::from_fn(|_| FxHashMap::default()));
        self.casters.push(Vec::new());
        self.converters.push(Vec::new());

        tracing::trace!(type_name = name, id = ty.index(), size, align, "registered type");
        ty
    }

    /// Register by name with the default alignment, for types whose layout
    /// is only known externally.
    pub fn register_named(&mut self, name: &str, size: usize) -> TypeId {
        self.register(name, size, DEFAULT_ALIGN)
    }

    /// Non-mutating lookup; `TypeId::INVALID` when the name is unknown.
    pub fn find(&self, name: &str) -> TypeId {
        self.names
            .get(name)
            .and_then(|id| self.types_by_name.get(&id).copied())
            .unwrap_or(TypeId::INVALID)
    }

    pub fn valid(&self, ty: TypeId) -> bool {
        ty.is_valid() && ty.to_usize() < self.infos.len()
    }

    pub fn try_get(&self, ty: TypeId) -> Result<&TypeInfo, MetaError> {
        if self.valid(ty) {
            Ok(&self.infos[ty.to_usize()])
        } else {
            Err(MetaError::InvalidType(ty))
        }
    }

    /// Metadata for a registered type. Panics on an out-of-range id.
    pub fn get(&self, ty: TypeId) -> &TypeInfo {
        self.try_get(ty).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn name_of(&self, ty: TypeId) -> &str {
        self.names.resolve(self.get(ty).name)
    }

    pub fn type_count(&self) -> usize {
        self.infos.len()
    }

    /// Record direct parents for `derived`, closing over their transitive
    /// bases. Returns false if any listed parent id is not valid; a parent
    /// equal to `derived` is skipped.
    pub fn add_inheritance(&mut self, derived: TypeId, parents: &[TypeId]) -> bool {
        if !self.valid(derived) {
            return false;
        }
        for &parent in parents {
            if !self.valid(parent) {
                return false;
            }
            if parent == derived {
                continue;
            }
            self.infos[derived.to_usize()].set_base(parent);

            let parent_bases: Vec<TypeId> = self.infos[parent.to_usize()].bases().collect();
            if !self.add_inheritance(derived, &parent_bases) {
                return false;
            }
        }
        true
    }

    // ---- constructors ----------------------------------------------------

    /// First writer wins: returns false if the signature already has a
    /// constructor.
    pub fn add_constructor(&mut self, ty: TypeId, f: ConstructorFn, sig: Signature) -> bool {
        let index = self.check(ty);
        let row = &mut self.ctors[index];
        if row.contains_key(&sig) {
            return false;
        }
        row.insert(sig, f);
        true
    }

    pub fn try_constructor(&self, ty: TypeId, sig: &Signature) -> Result<ConstructorFn, MetaError> {
        self.try_get(ty)?;
        self.lookup_overload(&self.ctors[ty.to_usize()], sig)
            .ok_or_else(|| MetaError::MissingConstructor {
                ty,
                sig: format!("{sig:?}"),
            })
    }

    pub fn constructor(&self, ty: TypeId, sig: &Signature) -> ConstructorFn {
        self.try_constructor(ty, sig).unwrap_or_else(|e| panic!("{e}"))
    }

    // ---- destructors -----------------------------------------------------

    /// Last writer wins.
    pub fn add_destructor(&mut self, ty: TypeId, f: DestructorFn) -> bool {
        let index = self.check(ty);
        self.dtors[index] = Some(f);
        true
    }

    pub fn try_destructor(&self, ty: TypeId) -> Result<DestructorFn, MetaError> {
        self.try_get(ty)?;
        self.dtors[ty.to_usize()].ok_or(MetaError::MissingDestructor(ty))
    }

    pub fn destructor(&self, ty: TypeId) -> DestructorFn {
        self.try_destructor(ty).unwrap_or_else(|e| panic!("{e}"))
    }

    // ---- assigners -------------------------------------------------------

    /// First writer wins for a given right-hand signature.
    pub fn add_assigner(&mut self, ty: TypeId, f: AssignerFn, sig: Signature) -> bool {
        let index = self.check(ty);
        let row = &mut self.assigners[index];
        if row.contains_key(&sig) {
            return false;
        }
        row.insert(sig, f);
        true
    }

    pub fn try_assigner(&self, ty: TypeId, sig: &Signature) -> Result<AssignerFn, MetaError> {
        self.try_get(ty)?;
        self.lookup_overload(&self.assigners[ty.to_usize()], sig)
            .ok_or_else(|| MetaError::MissingAssigner {
                ty,
                sig: format!("{sig:?}"),
            })
    }

    pub fn assigner(&self, ty: TypeId, sig: &Signature) -> AssignerFn {
        self.try_assigner(ty, sig).unwrap_or_else(|e| panic!("{e}"))
    }

    // ---- operators -------------------------------------------------------

    pub fn add_unary_op(&mut self, ty: TypeId, f: UnaryFn, op: UnaryOp, sig: Signature) -> bool {
        let index = self.check(ty);
        let row = &mut self.unary[index][op.index()];
        if row.contains_key(&sig) {
            return false;
        }
        row.insert(sig, f);
        true
    }

    pub fn try_unary_op(
        &self,
        ty: TypeId,
        op: UnaryOp,
        sig: &Signature,
    ) -> Result<UnaryFn, MetaError> {
        self.try_get(ty)?;
        self.lookup_overload(&self.unary[ty.to_usize()][op.index()], sig)
            .ok_or_else(|| MetaError::MissingUnaryOp {
                ty,
                op,
                sig: format!("{sig:?}"),
            })
    }

    pub fn unary_op(&self, ty: TypeId, op: UnaryOp, sig: &Signature) -> UnaryFn {
        self.try_unary_op(ty, op, sig).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn add_binary_op(&mut self, ty: TypeId, f: BinaryFn, op: BinaryOp, sig: Signature) -> bool {
        let index = self.check(ty);
        let row = &mut self.binary[index][op.index()];
        if row.contains_key(&sig) {
            return false;
        }
        row.insert(sig, f);
        true
    }

    pub fn try_binary_op(
        &self,
        ty: TypeId,
        op: BinaryOp,
        sig: &Signature,
    ) -> Result<BinaryFn, MetaError> {
        self.try_get(ty)?;
        self.lookup_overload(&self.binary[ty.to_usize()][op.index()], sig)
            .ok_or_else(|| MetaError::MissingBinaryOp {
                ty,
                op,
                sig: format!("{sig:?}"),
            })
    }

    pub fn binary_op(&self, ty: TypeId, op: BinaryOp, sig: &Signature) -> BinaryFn {
        self.try_binary_op(ty, op, sig)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    // ---- casters and converters ------------------------------------------

    /// Casters are one-directional; first writer wins per `(from, to)` pair.
    pub fn add_caster(&mut self, from: TypeId, to: TypeId, f: CasterFn) -> bool {
        let to_index = self.check(to);
        let from_index = self.check(from);
        let row = &mut self.casters[from_index];
        if to_index >= row.len() {
            row.resize(to_index + 1, None);
        }
        if row[to_index].is_some() {
            return false;
        }
        row[to_index] = Some(f);
        true
    }

    /// Install both directions of a reinterpretation pair.
    pub fn add_two_way_cast(
        &mut self,
        a: TypeId,
        b: TypeId,
        a_to_b: CasterFn,
        b_to_a: CasterFn,
    ) -> bool {
        self.add_caster(a, b, a_to_b) && self.add_caster(b, a, b_to_a)
    }

    pub fn is_castable(&self, from: TypeId, to: TypeId) -> bool {
        self.valid(from)
            && self.valid(to)
            && self.casters[from.to_usize()]
                .get(to.to_usize())
                .copied()
                .flatten()
                .is_some()
    }

    pub fn try_caster(&self, from: TypeId, to: TypeId) -> Result<CasterFn, MetaError> {
        self.try_get(from)?;
        self.try_get(to)?;
        self.casters[from.to_usize()]
            .get(to.to_usize())
            .copied()
            .flatten()
            .ok_or(MetaError::NotCastable { from, to })
    }

    pub fn caster(&self, from: TypeId, to: TypeId) -> CasterFn {
        self.try_caster(from, to).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Converters materialize a fresh destination value; first writer wins.
    pub fn add_converter(&mut self, from: TypeId, to: TypeId, f: ConverterFn) -> bool {
        let to_index = self.check(to);
        let from_index = self.check(from);
        let row = &mut self.converters[from_index];
        if to_index >= row.len() {
            row.resize(to_index + 1, None);
        }
        if row[to_index].is_some() {
            return false;
        }
        row[to_index] = Some(f);
        true
    }

    pub fn is_convertible(&self, from: TypeId, to: TypeId) -> bool {
        self.valid(from)
            && self.valid(to)
            && self.converters[from.to_usize()]
                .get(to.to_usize())
                .copied()
                .flatten()
                .is_some()
    }

    pub fn try_converter(&self, from: TypeId, to: TypeId) -> Result<ConverterFn, MetaError> {
        self.try_get(from)?;
        self.try_get(to)?;
        self.converters[from.to_usize()]
            .get(to.to_usize())
            .copied()
            .flatten()
            .ok_or(MetaError::NotConvertible { from, to })
    }

    pub fn converter(&self, from: TypeId, to: TypeId) -> ConverterFn {
        self.try_converter(from, to).unwrap_or_else(|e| panic!("{e}"))
    }

    // ---- overload resolution ---------------------------------------------

    /// Exact signature match first; otherwise a unique compatible overload
    /// where every argument binds to the declared parameter (same type or a
    /// registered base, qualifier binding rules).
    fn lookup_overload<V: Copy>(
        &self,
        table: &FxHashMap<Signature, V>,
        actual: &Signature,
    ) -> Option<V> {
        if let Some(&v) = table.get(actual) {
            return Some(v);
        }

        let mut found = None;
        let mut count = 0usize;
        for (declared, &v) in table {
            if self.signature_binds(actual, declared) {
                found = Some(v);
                count += 1;
            }
        }
        match count {
            0 => None,
            1 => found,
            _ => panic!("ambiguous overload for argument signature {actual:?}"),
        }
    }

    fn signature_binds(&self, actual: &Signature, declared: &Signature) -> bool {
        if actual.arity() != declared.arity() {
            return false;
        }
        actual
            .params()
            .iter()
            .zip(declared.params())
            .all(|(a, d)| {
                let type_ok = a.ty == d.ty
                    || (self.valid(a.ty) && self.valid(d.ty) && self.get(a.ty).has_base(d.ty));
                type_ok && a.quals.binds_to(d.quals)
            })
    }

    fn check(&self, ty: TypeId) -> usize {
        assert!(self.valid(ty), "type id {} is not registered", ty.index());
        ty.to_usize()
    }

    // ---- diagnostics -----------------------------------------------------

    /// Render the type table and memory statistics into a sink.
    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        const TAG: &str = "[meta] ";

        writeln!(out, "{TAG}-------------------- types --------------------")?;
        let digits = self.infos.len().max(1).ilog10() as usize + 1;
        for info in &self.infos {
            write!(
                out,
                "{TAG}id {:0digits$} | {} ({} bytes, align {})",
                info.id.index(),
                self.names.resolve(info.name),
                info.size,
                info.align,
            )?;
            if info.num_bases() > 0 {
                let mut bases = String::new();
                for (i, base) in info.bases().enumerate() {
                    if i > 0 {
                        bases.push_str(", ");
                    }
                    bases.push_str(self.name_of(base));
                }
                write!(out, " | bases: {bases}")?;
            }
            writeln!(out)?;
        }
        writeln!(out, "{TAG}types: {}", self.infos.len())?;

        for info in &self.infos {
            if let Some(stats) = crate::memory::pool_stats(info.id) {
                writeln!(
                    out,
                    "{TAG}pool {} | live {} | capacity {} | free {}",
                    self.names.resolve(info.name),
                    stats.live,
                    stats.capacity,
                    stats.free,
                )?;
            }
            if let Some(stats) = crate::memory::heap_stats(info.id) {
                writeln!(
                    out,
                    "{TAG}heap {} | live {} | capacity {} | free ranges {}",
                    self.names.resolve(info.name),
                    stats.live,
                    stats.capacity,
                    stats.free_ranges,
                )?;
            }
        }
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::new());
}

/// Run `f` with the calling thread's default registry.
///
/// The borrow is exclusive for the duration of `f`: do not construct or drop
/// owning handles, or touch views that consult the registry, inside the
/// closure. The memory orchestration in this crate never invokes a user
/// callback while the borrow is held.
pub fn with<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
    REGISTRY.with(|cell| f(&mut cell.borrow_mut()))
}

/// The registry's type table rendered to a string, for logs and the CLI.
pub fn dump_to_string() -> String {
    let mut out = String::new();
    with(|r| r.dump(&mut out)).expect("formatting a String cannot fail");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::default_ctor;
    use crate::qualifier::Qualifiers;
    use crate::signature::Parameter;

    #[test]
    fn registration_is_idempotent() {
        let mut r = Registry::new();
        let first = r.register("Foo", 8, 8);
        let count = r.type_count();
        let second = r.register("Foo", 8, 8);
        assert_eq!(first, second);
        assert_eq!(r.type_count(), count);
    }

    #[test]
    fn bootstrap_assigns_primitive_ids_in_tag_order() {
        let r = Registry::new();
        for prim in Primitive::ALL {
            assert_eq!(r.find(prim.name()), prim.type_id());
        }
        assert!(r.find("View").is_valid());
        assert!(r.find("Handle").is_valid());
    }

    #[test]
    fn find_returns_invalid_for_unknown_names() {
        let r = Registry::new();
        assert_eq!(r.find("NoSuchType"), TypeId::INVALID);
        assert!(!r.valid(TypeId::INVALID));
        assert!(!r.valid(TypeId::new(9999)));
    }

    #[test]
    fn inheritance_is_transitive_and_irreflexive() {
        let mut r = Registry::new();
        let a = r.register("A", 4, 4);
        let b = r.register("B", 4, 4);
        let d = r.register("D", 4, 4);

        assert!(r.add_inheritance(b, &[a]));
        assert!(r.add_inheritance(d, &[b]));

        assert!(r.get(d).has_base(a));
        assert!(r.get(d).has_base(b));
        assert!(!r.get(d).has_base(d));
        assert_eq!(r.get(d).num_bases(), 2);

        // re-walking an already-set base is idempotent
        assert!(r.add_inheritance(d, &[b]));
        assert_eq!(r.get(d).num_bases(), 2);
    }

    #[test]
    fn inheritance_rejects_invalid_parents() {
        let mut r = Registry::new();
        let d = r.register("D", 4, 4);
        assert!(!r.add_inheritance(d, &[TypeId::new(4242)]));
    }

    #[test]
    fn constructor_first_writer_wins() {
        let mut r = Registry::new();
        let ty = r.register("Foo", 4, 4);
        let f: ConstructorFn = |_, _| {};
        assert!(r.add_constructor(ty, f, Signature::empty()));
        assert!(!r.add_constructor(ty, f, Signature::empty()));
    }

    #[test]
    fn destructor_last_writer_wins() {
        let mut r = Registry::new();
        let ty = r.register("Foo", 4, 4);
        let first: DestructorFn = |_| panic!("stale destructor");
        let second: DestructorFn = |_| {};
        assert!(r.add_destructor(ty, first));
        assert!(r.add_destructor(ty, second));
        let dtor = r.destructor(ty);
        dtor(View::invalid());
    }

    #[test]
    fn casters_are_one_directional() {
        let mut r = Registry::new();
        let a = r.register("A", 4, 4);
        let b = r.register("B", 4, 4);
        let f: CasterFn = |v| v;
        assert!(r.add_caster(a, b, f));
        assert!(r.is_castable(a, b));
        assert!(!r.is_castable(b, a));

        assert!(r.add_caster(b, a, f));
        assert!(r.is_castable(b, a));
    }

    #[test]
    fn two_way_cast_installs_both_directions() {
        let mut r = Registry::new();
        let a = r.register("A", 4, 4);
        let b = r.register("B", 4, 4);
        let f: CasterFn = |v| v;
        assert!(r.add_two_way_cast(a, b, f, f));
        assert!(r.is_castable(a, b));
        assert!(r.is_castable(b, a));
    }

    #[test]
    fn overload_lookup_prefers_exact_signature() {
        let mut r = Registry::new();
        let ty = r.register("Foo", 4, 4);
        let i32_ty = Primitive::I32.type_id();

        let by_ref: ConstructorFn = |_, _| {};
        let by_move: ConstructorFn = |_, _| panic!("move overload chosen");

        let const_ref: Signature = [Parameter::new(i32_ty, Qualifiers::CONST_REF)]
            .into_iter()
            .collect();
        let temporary: Signature = [Parameter::new(i32_ty, Qualifiers::TEMPORARY)]
            .into_iter()
            .collect();

        assert!(r.add_constructor(ty, by_ref, const_ref.clone()));
        assert!(r.add_constructor(ty, by_move, temporary));

        let ctor = r.constructor(ty, &const_ref);
        ctor(View::invalid(), &crate::span::Span::new());
    }

    #[test]
    fn overload_lookup_binds_compatible_qualifiers() {
        let mut r = Registry::new();
        let ty = r.register("Foo", 4, 4);
        let i32_ty = Primitive::I32.type_id();

        let declared: Signature = [Parameter::new(i32_ty, Qualifiers::CONST_REF)]
            .into_iter()
            .collect();
        assert!(r.add_constructor(ty, default_ctor::<i32>(), declared));

        // a mutable reference argument binds to the const-ref parameter
        let actual: Signature = [Parameter::new(i32_ty, Qualifiers::REFERENCE)]
            .into_iter()
            .collect();
        assert!(r.try_constructor(ty, &actual).is_ok());

        // arity mismatch does not
        assert!(r.try_constructor(ty, &Signature::empty()).is_err());
    }

    #[test]
    fn dump_lists_types_and_bases() {
        let mut r = Registry::new();
        let foo = r.register("Foo", 8, 8);
        let bar = r.register("Bar", 16, 8);
        assert!(r.add_inheritance(bar, &[foo]));

        let mut out = String::new();
        r.dump(&mut out).unwrap();
        assert!(out.contains("Foo"));
        assert!(out.contains("bases: Foo"));
        assert!(out.contains(&format!("types: {}", r.type_count())));
    }
}
