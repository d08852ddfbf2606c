pub mod fic_decoder;
pub mod fig_0_extensions;
pub mod fig_processor;
