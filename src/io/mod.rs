pub mod allocator;
pub mod fasta;
pub mod layout;

pub use allocator::{reserve_dir, unique_path, update_latest, LATEST_LINK};
pub use fasta::{read_lengths, read_records, write_records, FastaRecord};
pub use layout::{OutputLayout, ScratchDir};
