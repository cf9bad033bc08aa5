mod counting;
mod local;

pub use counting::CountingReader;
pub use local::{Compression, LocalPackReader};
