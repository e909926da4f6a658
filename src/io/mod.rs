pub mod a3m;
pub mod fasta;
