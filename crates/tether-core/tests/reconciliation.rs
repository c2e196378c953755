//! # Reconciliation Tests
//!
//! End-to-end behavior of the relationship cache through `Store`.
//!
//! ## Groups
//! - Symmetry
//! - Replace correctness
//! - Cardinality enforcement
//! - Reflexive relationships
//! - Unload retention
//! - Flush ordering

use tether_core::{
    PayloadData, Reference, RelationshipDefinition, RelationshipFragment, RelationshipFragments,
    SchemaDefinition, StaticSchema, Store,
};

fn store() -> Store<StaticSchema> {
    let def = SchemaDefinition::new()
        .relationship("user", "hobbies", RelationshipDefinition::has_many("hobby"))
        .relationship("hobby", "user", RelationshipDefinition::belongs_to("user"))
        .relationship(
            "user",
            "friends",
            RelationshipDefinition::has_many("user").with_inverse("friends"),
        )
        .relationship(
            "user",
            "best_friend",
            RelationshipDefinition::belongs_to("user").with_inverse("best_friend"),
        )
        .relationship("user", "tags", RelationshipDefinition::has_many("tag"))
        .relationship("tag", "users", RelationshipDefinition::has_many("user"))
        .relationship(
            "node",
            "parent",
            RelationshipDefinition::belongs_to("node").with_inverse("children"),
        )
        .relationship(
            "node",
            "children",
            RelationshipDefinition::has_many("node").with_inverse("parent"),
        );
    Store::new(StaticSchema::from_definition(&def).expect("schema"))
}

fn rel(name: &str, fragment: RelationshipFragment) -> RelationshipFragments {
    RelationshipFragments::from([(name.to_string(), fragment)])
}

fn r(type_name: &str, id: &str) -> Reference {
    Reference::new(type_name, id)
}

fn list(type_name: &str, ids: &[&str]) -> PayloadData {
    PayloadData::List(ids.iter().map(|id| r(type_name, id)).collect())
}

// =============================================================================
// WORKED EXAMPLE
// =============================================================================

mod worked_example {
    use super::*;

    /// user/1 has-many hobbies, hobby/2 belongs-to user.
    #[test]
    fn user_hobby_round_trip() {
        let mut store = store();

        store.push("user", "1", rel("hobbies", RelationshipFragment::many("hobby", ["2"])));

        let hobby = store.get("hobby", "2", "user").expect("hobby").clone();
        assert_eq!(hobby.data, PayloadData::Single(r("user", "1")));
        assert!(hobby.is_inverse_derived);

        store.push("hobby", "2", rel("user", RelationshipFragment::null()));

        let user = store.get("user", "1", "hobbies").expect("user");
        assert_eq!(user.data, PayloadData::List(Vec::new()));
        assert!(user.is_inverse_derived);
    }

    /// The same scenario fed from JSON wire fragments with integer ids.
    #[test]
    fn wire_fragments() {
        let mut store = store();
        let fragments: RelationshipFragments =
            serde_json::from_str(r#"{"hobbies":{"data":[{"id":2,"type":"hobby"}]}}"#)
                .expect("fragments");

        store.push("user", "1", fragments);

        let hobby = store.get("hobby", "2", "user").expect("hobby");
        assert_eq!(hobby.data, PayloadData::Single(r("user", "1")));
    }
}

// =============================================================================
// SYMMETRY
// =============================================================================

mod symmetry {
    use super::*;

    #[test]
    fn back_reference_appears_from_lhs_push() {
        let mut store = store();
        store.push("user", "1", rel("tags", RelationshipFragment::many("tag", ["7"])));

        let tag = store.get("tag", "7", "users").expect("tag");
        assert!(tag.data.contains(&r("user", "1")));
    }

    #[test]
    fn back_reference_appears_from_rhs_push() {
        let mut store = store();
        store.push("tag", "7", rel("users", RelationshipFragment::many("user", ["1"])));

        let user = store.get("user", "1", "tags").expect("user");
        assert!(user.data.contains(&r("tag", "7")));
    }

    #[test]
    fn independent_of_push_order() {
        let mut a = store();
        a.push("user", "1", rel("tags", RelationshipFragment::many("tag", ["7"])));
        a.push("tag", "7", rel("users", RelationshipFragment::many("user", ["1"])));

        let mut b = store();
        b.push("tag", "7", rel("users", RelationshipFragment::many("user", ["1"])));
        b.push("user", "1", rel("tags", RelationshipFragment::many("tag", ["7"])));

        for store in [&mut a, &mut b] {
            assert_eq!(store.get("user", "1", "tags").expect("user").data, list("tag", &["7"]));
            assert_eq!(store.get("tag", "7", "users").expect("tag").data, list("user", &["1"]));
        }
    }

    #[test]
    fn unseen_entity_is_not_cached() {
        let mut store = store();
        store.push("user", "1", rel("tags", RelationshipFragment::many("tag", ["7"])));

        assert!(store.get("tag", "8", "users").is_none());
        assert!(store.get("user", "2", "tags").is_none());
    }
}

// =============================================================================
// REPLACE CORRECTNESS
// =============================================================================

mod replace {
    use super::*;

    #[test]
    fn second_push_reverses_first() {
        let mut store = store();
        store.push("user", "1", rel("hobbies", RelationshipFragment::many("hobby", ["2", "3"])));
        store.push("user", "1", rel("hobbies", RelationshipFragment::many("hobby", ["3", "4"])));

        assert_eq!(store.get("hobby", "2", "user").expect("2").data, PayloadData::Empty);
        assert_eq!(
            store.get("hobby", "3", "user").expect("3").data,
            PayloadData::Single(r("user", "1"))
        );
        assert_eq!(
            store.get("hobby", "4", "user").expect("4").data,
            PayloadData::Single(r("user", "1"))
        );
        assert_eq!(
            store.get("user", "1", "hobbies").expect("user").data,
            list("hobby", &["3", "4"])
        );
    }

    #[test]
    fn explicit_null_clears() {
        let mut store = store();
        store.push("hobby", "2", rel("user", RelationshipFragment::one("user", "1")));
        store.push("hobby", "2", rel("user", RelationshipFragment::null()));

        let hobby = store.get("hobby", "2", "user").expect("hobby");
        assert_eq!(hobby.data, PayloadData::Empty);
        assert!(!hobby.is_inverse_derived);
        assert_eq!(
            store.get("user", "1", "hobbies").expect("user").data,
            PayloadData::List(Vec::new())
        );
    }

    #[test]
    fn absent_fragment_changes_nothing() {
        let mut store = store();
        store.push("hobby", "2", rel("user", RelationshipFragment::one("user", "1")));
        store.push("hobby", "2", RelationshipFragments::new());
        store.push("hobby", "2", rel("user", RelationshipFragment::default()));

        let hobby = store.get("hobby", "2", "user").expect("hobby");
        assert_eq!(hobby.data, PayloadData::Single(r("user", "1")));
        assert!(!hobby.is_inverse_derived);
    }

    #[test]
    fn fragment_without_linkage_is_not_cached() {
        let mut store = store();
        let fragments: RelationshipFragments =
            serde_json::from_str(r#"{"user": {}}"#).expect("fragments");

        store.push("hobby", "2", fragments);

        assert!(store.get("hobby", "2", "user").is_none());
        assert!(store.get("user", "1", "hobbies").is_none());
    }

    #[test]
    fn links_without_linkage_are_not_cached() {
        let mut store = store();
        let fragments: RelationshipFragments =
            serde_json::from_str(r#"{"hobbies": {"links": {"related": "/users/1/hobbies"}}}"#)
                .expect("fragments");

        store.push("user", "1", fragments);

        assert!(store.get("user", "1", "hobbies").is_none());
    }

    #[test]
    fn links_update_keeps_linkage_and_provenance() {
        let mut store = store();
        store.push("user", "1", rel("hobbies", RelationshipFragment::many("hobby", ["2"])));
        let fragments: RelationshipFragments =
            serde_json::from_str(r#"{"user": {"meta": {"count": 1}}}"#).expect("fragments");

        store.push("hobby", "2", fragments);

        let hobby = store.get("hobby", "2", "user").expect("hobby");
        assert_eq!(hobby.data, PayloadData::Single(r("user", "1")));
        assert!(hobby.is_inverse_derived);
        assert_eq!(hobby.meta, Some(serde_json::json!({"count": 1})));
    }

    #[test]
    fn undeclared_relationship_does_not_fail_push() {
        let mut store = store();
        let mut fragments = rel("hobbies", RelationshipFragment::many("hobby", ["2"]));
        fragments.insert("pets".to_string(), RelationshipFragment::many("pet", ["1"]));

        store.push("user", "1", fragments);

        assert!(store.get("user", "1", "pets").is_none());
        assert!(store.get("hobby", "2", "user").is_some());
    }
}

// =============================================================================
// CARDINALITY ENFORCEMENT
// =============================================================================

mod cardinality {
    use super::*;

    #[test]
    fn to_one_inverse_never_accumulates() {
        let mut store = store();
        store.push("user", "1", rel("hobbies", RelationshipFragment::many("hobby", ["2"])));
        store.push("user", "3", rel("hobbies", RelationshipFragment::many("hobby", ["2"])));

        let hobby = store.get("hobby", "2", "user").expect("hobby");
        assert_eq!(hobby.data, PayloadData::Single(r("user", "3")));
    }

    #[test]
    fn to_many_inverse_keeps_earlier_owners() {
        let mut store = store();
        store.push("hobby", "2", rel("user", RelationshipFragment::one("user", "1")));
        store.push("hobby", "3", rel("user", RelationshipFragment::one("user", "1")));
        store.push("hobby", "4", rel("user", RelationshipFragment::one("user", "1")));

        let user = store.get("user", "1", "hobbies").expect("user");
        assert_eq!(user.data, list("hobby", &["2", "3", "4"]));
        assert!(user.is_inverse_derived);
    }

    #[test]
    fn list_pushed_to_one_side_is_coerced() {
        let mut store = store();
        store.push("hobby", "2", rel("user", RelationshipFragment::many("user", ["1", "5"])));

        let hobby = store.get("hobby", "2", "user").expect("hobby");
        assert_eq!(hobby.data, PayloadData::Single(r("user", "1")));
        assert!(store.get("user", "5", "hobbies").is_none());
    }

    #[test]
    fn self_referential_pair_uses_separate_sides() {
        let mut store = store();
        store.push("node", "1", rel("children", RelationshipFragment::many("node", ["1", "2"])));

        assert_eq!(
            store.get("node", "1", "parent").expect("1").data,
            PayloadData::Single(r("node", "1"))
        );
        assert_eq!(
            store.get("node", "2", "parent").expect("2").data,
            PayloadData::Single(r("node", "1"))
        );
        assert_eq!(
            store.get("node", "1", "children").expect("children").data,
            list("node", &["1", "2"])
        );
    }
}

// =============================================================================
// REFLEXIVE RELATIONSHIPS
// =============================================================================

mod reflexive {
    use super::*;

    #[test]
    fn self_reference_is_not_duplicated() {
        let mut store = store();
        store.push("user", "1", rel("friends", RelationshipFragment::many("user", ["1", "2"])));

        let own = store.get("user", "1", "friends").expect("own");
        assert_eq!(own.data, list("user", &["1", "2"]));
        assert!(!own.is_inverse_derived);

        let friend = store.get("user", "2", "friends").expect("friend");
        assert_eq!(friend.data, list("user", &["1"]));
    }

    #[test]
    fn friendship_is_symmetric_after_replace() {
        let mut store = store();
        store.push("user", "1", rel("friends", RelationshipFragment::many("user", ["2"])));
        store.push("user", "1", rel("friends", RelationshipFragment::many("user", ["3"])));

        assert_eq!(
            store.get("user", "2", "friends").expect("2").data,
            PayloadData::List(Vec::new())
        );
        assert_eq!(store.get("user", "3", "friends").expect("3").data, list("user", &["1"]));
    }

    #[test]
    fn unload_strikes_friend_but_not_self() {
        let mut store = store();
        store.push("user", "1", rel("friends", RelationshipFragment::many("user", ["1", "2"])));

        store.unload("user", "1");

        assert!(store.get("user", "1", "friends").is_none());
        assert_eq!(
            store.get("user", "2", "friends").expect("2").data,
            PayloadData::List(Vec::new())
        );
    }

    #[test]
    fn reflexive_to_one() {
        let mut store = store();
        store.push("user", "1", rel("best_friend", RelationshipFragment::one("user", "2")));

        assert_eq!(
            store.get("user", "2", "best_friend").expect("2").data,
            PayloadData::Single(r("user", "1"))
        );

        store.push("user", "1", rel("best_friend", RelationshipFragment::one("user", "1")));
        assert_eq!(
            store.get("user", "2", "best_friend").expect("2").data,
            PayloadData::Empty
        );
        assert_eq!(
            store.get("user", "1", "best_friend").expect("1").data,
            PayloadData::Single(r("user", "1"))
        );
    }
}

// =============================================================================
// UNLOAD RETENTION
// =============================================================================

mod unload {
    use super::*;

    #[test]
    fn resident_inverse_keeps_back_reference() {
        let mut store = store();
        store.push("user", "1", rel("hobbies", RelationshipFragment::many("hobby", ["2"])));
        store.materialize("hobby", "2");

        store.unload("user", "1");

        assert_eq!(
            store.get("hobby", "2", "user").expect("hobby").data,
            PayloadData::Single(r("user", "1"))
        );
        assert!(store.get("user", "1", "hobbies").is_some());
    }

    #[test]
    fn non_resident_inverse_is_purged() {
        let mut store = store();
        store.push("user", "1", rel("hobbies", RelationshipFragment::many("hobby", ["2"])));

        store.unload("user", "1");

        assert!(store.get("user", "1", "hobbies").is_none());
        assert_eq!(store.get("hobby", "2", "user").expect("hobby").data, PayloadData::Empty);
    }

    #[test]
    fn any_resident_inverse_retains() {
        let mut store = store();
        store.push("user", "1", rel("hobbies", RelationshipFragment::many("hobby", ["2", "3"])));
        store.materialize("hobby", "3");

        store.unload("user", "1");

        assert_eq!(
            store.get("user", "1", "hobbies").expect("user").data,
            list("hobby", &["2", "3"])
        );
        assert_eq!(
            store.get("hobby", "2", "user").expect("hobby").data,
            PayloadData::Single(r("user", "1"))
        );
    }

    #[test]
    fn unload_sees_pending_pushes() {
        let mut store = store();
        store.push("user", "1", rel("hobbies", RelationshipFragment::many("hobby", ["2"])));
        store.push("user", "1", rel("hobbies", RelationshipFragment::many("hobby", ["3"])));

        store.unload("user", "1");

        assert_eq!(store.get("hobby", "2", "user").expect("2").data, PayloadData::Empty);
        assert_eq!(store.get("hobby", "3", "user").expect("3").data, PayloadData::Empty);
    }

    #[test]
    fn unload_of_unknown_entity_is_noop() {
        let mut store = store();
        store.unload("user", "42");
        store.unload("ghost", "1");
        assert_eq!(store.payloads().ledger_count(), 0);
    }
}

// =============================================================================
// FLUSH ORDERING
// =============================================================================

mod flush_ordering {
    use super::*;

    #[test]
    fn three_pushes_then_read() {
        let mut store = store();
        store.push("user", "1", rel("hobbies", RelationshipFragment::many("hobby", ["2"])));
        store.push("user", "1", rel("hobbies", RelationshipFragment::many("hobby", ["3", "4"])));
        store.push("user", "1", rel("hobbies", RelationshipFragment::many("hobby", ["4", "5"])));

        assert_eq!(
            store.get("user", "1", "hobbies").expect("user").data,
            list("hobby", &["4", "5"])
        );
        assert_eq!(store.get("hobby", "2", "user").expect("2").data, PayloadData::Empty);
        assert_eq!(store.get("hobby", "3", "user").expect("3").data, PayloadData::Empty);
        assert_eq!(
            store.get("hobby", "4", "user").expect("4").data,
            PayloadData::Single(r("user", "1"))
        );
        assert_eq!(
            store.get("hobby", "5", "user").expect("5").data,
            PayloadData::Single(r("user", "1"))
        );
    }

    #[test]
    fn interleaved_sides_apply_in_arrival_order() {
        let mut store = store();
        store.push("user", "1", rel("hobbies", RelationshipFragment::many("hobby", ["2"])));
        store.push("hobby", "2", rel("user", RelationshipFragment::null()));
        store.push("user", "3", rel("hobbies", RelationshipFragment::many("hobby", ["2"])));

        assert_eq!(
            store.get("hobby", "2", "user").expect("2").data,
            PayloadData::Single(r("user", "3"))
        );
        assert_eq!(
            store.get("user", "1", "hobbies").expect("1").data,
            PayloadData::List(Vec::new())
        );
    }
}
