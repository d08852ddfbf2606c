pub mod cif_deinterleaver;
pub mod msc_decoder;
pub mod protection_tables;
