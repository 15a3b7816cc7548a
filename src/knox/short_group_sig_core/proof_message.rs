use blsful::inner_types::Scalar;

/// How a hidden slot gets its Schnorr blinding
#[derive(Copy, Clone, Debug)]
pub enum HiddenMessage {
    /// A fresh blinding used only inside the signature proof
    ProofSpecificBlinding(Scalar),
    /// `(message, blinding)` where the blinding is shared with another
    /// proof that must show the same value: the master secret link,
    /// a predicate commitment or the revocation element
    ExternalBlinding(Scalar, Scalar),
}

/// One slot of a signed message vector as the holder presents it
#[derive(Copy, Clone, Debug)]
pub enum ProofMessage {
    /// Disclosed to the verifier
    Revealed(Scalar),
    /// Proven without disclosure
    Hidden(HiddenMessage),
}
