pub mod arithmetic_coder;
pub mod io;


pub use arithmetic_coder::{ACRead, ACWrite, ArithmeticCoder};
pub use io::{ACReader, ACWriter, BitCounter};
