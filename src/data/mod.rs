/// Data layer: GeoCSV reading, typing, projection and resampling.
///
/// Architecture:
/// ```text
///  .geoCSV (file or in-memory)
///        │
///        ▼
///   ┌──────────┐
///   │  source   │  buffered lines, metadata / data classification
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  `#key: value` → MetadataRecord, rest → TabularDataset
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌────────────┐ ┌──────────┐
///   │ projection │ │ resample │  numeric tuples / time bins
///   └────────────┘ └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod projection;
pub mod resample;
pub mod source;
