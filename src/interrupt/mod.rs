pub mod int10;
pub mod int13;
pub mod int16;
pub mod int1a;
pub mod int21;
