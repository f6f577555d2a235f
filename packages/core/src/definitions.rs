mod key;
pub use key::*;

mod picc_data_tag;
pub use picc_data_tag::*;

mod read_counter;
pub use read_counter::*;

mod uid;
pub use uid::*;
