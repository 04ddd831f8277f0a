/// Data layer: patient records, loading, and group filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset (typed, validated)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Vec<Record>, sorted group index
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  Selection → filtered records
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
