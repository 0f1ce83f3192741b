//! Type lattice properties (spec.md 8, T3-T6), plus the n-ary fold's
//! interface-intersection fallback, which no single module's unit tests
//! exercise end to end (it spans `types::TypeRef::all_interfaces` and
//! `conversion::common_base_type_n` together).

mod support;

use dynacore::conversion::{common_base_type, common_base_type_n, has_implicit_conversion};
use dynacore::types::{self, TypeCode, TypeRef};

#[test]
fn common_base_of_identical_type_is_itself() {
    let t = types::DOUBLE.clone();
    assert_eq!(common_base_type(Some(&t), Some(&t)), t);
}

#[test]
fn unknown_dominates_any_pairing() {
    assert_eq!(common_base_type(Some(&types::UNKNOWN), Some(&types::BOOL)), *types::UNKNOWN);
    assert_eq!(common_base_type(Some(&types::STRING), Some(&types::UNKNOWN)), *types::UNKNOWN);
}

#[test]
fn implicit_conversion_determines_the_common_base_symmetrically() {
    assert!(has_implicit_conversion(&types::SHORT, &types::INT));
    assert_eq!(common_base_type(Some(&types::SHORT), Some(&types::INT)), *types::INT);
    assert_eq!(common_base_type(Some(&types::INT), Some(&types::SHORT)), *types::INT);
}

#[test]
fn promotion_table_matches_the_documented_cases() {
    assert_eq!(
        common_base_type(Some(&types::INT), Some(&types::UINT)),
        *types::LONG
    );
    assert_eq!(
        common_base_type(Some(&types::LONG), Some(&types::ULONG)),
        *types::BIGINT
    );
    assert_eq!(
        common_base_type(Some(&types::SHORT), Some(&types::USHORT)),
        *types::INT
    );
    assert_eq!(
        common_base_type(Some(&types::DOUBLE), Some(&types::INT)),
        *types::DOUBLE
    );
}

#[test]
fn n_ary_fold_prefers_a_shared_interface_over_object() {
    let comparable = TypeRef::new_reference("IComparable");
    let enumerable = TypeRef::new_reference("IEnumerable");

    let list_a = TypeRef::new_reference("ListA");
    list_a.add_interface(comparable.clone());
    list_a.add_interface(enumerable.clone());

    let list_b = TypeRef::new_reference("ListB");
    list_b.add_interface(comparable.clone());

    let list_c = TypeRef::new_reference("ListC");
    list_c.add_interface(comparable.clone());
    list_c.add_interface(enumerable.clone());

    // Pairwise, ListA/ListB/ListC share no subclass relation, so the running
    // fold degrades straight to Object -- but all three implement
    // IComparable, so the intersection search should recover it instead of
    // returning Object.
    let result = common_base_type_n(&[Some(list_a), Some(list_b), Some(list_c)]);
    assert_eq!(result, comparable);
}

#[test]
fn n_ary_fold_returns_object_when_an_explicit_object_or_null_is_present() {
    let comparable = TypeRef::new_reference("IComparable");
    let a = TypeRef::new_reference("A");
    a.add_interface(comparable.clone());
    let b = TypeRef::new_reference("B");
    b.add_interface(comparable);

    // A literal `null` (None) in the mix disqualifies the interface
    // fallback even though A and B share an interface.
    let result = common_base_type_n(&[Some(a), None, Some(b)]);
    assert_eq!(result, *types::OBJECT);
}

#[test]
fn subclass_relationship_wins_over_object_degradation() {
    let animal = TypeRef::new_reference("Animal");
    let dog = TypeRef::new_reference("Dog");
    dog.set_base_type(animal.clone());
    let result = common_base_type_n(&[Some(dog), Some(animal.clone())]);
    assert_eq!(result, animal);
}

#[test]
fn byte_size_drives_the_same_size_different_sign_promotion_branch() {
    assert_eq!(TypeCode::Int.byte_size(), Some(4));
    assert_eq!(TypeCode::Long.byte_size(), Some(8));
    assert_eq!(TypeCode::Object.byte_size(), None);
}
