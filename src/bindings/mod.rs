// Python facade, built only with the `python` feature.
pub mod python;
