pub mod compare;
pub mod fingerprint;
pub mod hash;
pub mod identify;
pub mod matcher;
pub mod media;
pub mod remover;
pub mod scanner;
