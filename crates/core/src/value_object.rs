//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "change" one,
/// build a new value with the new fields. That makes them safe to copy around,
/// hash, and keep in sets without surprises.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: No identity (two value objects with same values are equal)
/// - **Entity**: Has identity (two entities with same ID are the same entity)
///
/// Example:
/// - "order-001 wants 10 of SMALL-TABLE" is a value object: any two lines
///   carrying those fields state the same fact
/// - a batch is an entity: its stock level changes over time but its
///   reference does not
///
/// ## Design Constraints
///
/// The trait requires:
/// - **Clone**: values travel by copy, not by reference
/// - **PartialEq**: compared field by field
/// - **Debug**: printable in test failures and logs
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
