/// Data layer: schema, loading, normalization and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  read retained columns → Vec<RawRow>
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ normalize │  RawValue → Option<f64>, drop sparse rows → Dataset
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  control / region predicate → filtered positions
///   └──────────┘
/// ```
///
/// `schema` holds the column names, metric units and code lookups shared by all three.

pub mod filter;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod schema;
