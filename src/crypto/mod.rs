pub mod encryption;

pub use encryption::{
    generate_nonce, generate_secret, EncryptionContext, KEY_DERIVATION_MESSAGE,
};
