/// Vitto Biryukov 2020 dynamic universal accumulator
pub mod vb20;
