pub mod signature_utils;
