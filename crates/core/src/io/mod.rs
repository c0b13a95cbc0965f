//! I/O operations for reading raw features and writing cleaned output

mod geojson_io;

pub use geojson_io::{
    parse_features, read_features, records_to_geojson, write_audit, write_geometry, write_records,
};
