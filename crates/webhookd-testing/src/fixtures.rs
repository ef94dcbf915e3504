//! Fixture RSA key pairs.
//!
//! Each pair is a PKCS#1 private key plus a self-signed certificate over
//! its public half, so the certificate can be published as an `x5c` entry
//! and the private key used to sign tokens that verify against it.

/// A signing key with the certificate that publishes it.
#[derive(Debug, Clone, Copy)]
pub struct KeyPair {
    /// Key identifier placed in token headers and JWKS entries.
    pub kid: &'static str,
    /// PEM-encoded RSA private key.
    pub private_key_pem: &'static str,
    /// PEM-encoded self-signed certificate.
    pub certificate_pem: &'static str,
}

impl KeyPair {
    /// The default signing key.
    pub const fn primary() -> Self {
        Self {
            kid: "primary",
            private_key_pem: include_str!("../fixtures/primary.key.pem"),
            certificate_pem: include_str!("../fixtures/primary.cert.pem"),
        }
    }

    /// A second, unrelated signing key.
    pub const fn secondary() -> Self {
        Self {
            kid: "secondary",
            private_key_pem: include_str!("../fixtures/secondary.key.pem"),
            certificate_pem: include_str!("../fixtures/secondary.cert.pem"),
        }
    }

    /// Returns the same key material published under another `kid`.
    #[must_use]
    pub const fn with_kid(self, kid: &'static str) -> Self {
        Self { kid, ..self }
    }

    /// Returns the certificate as a standard base64 DER string, the form
    /// used inside an `x5c` array.
    pub fn x5c(&self) -> String {
        pem_body(self.certificate_pem)
    }
}

/// Returns an `x5c` value whose certificate carries an EC P-256 key.
pub fn ec_certificate_x5c() -> String {
    pem_body(include_str!("../fixtures/ec.cert.pem"))
}

fn pem_body(pem: &str) -> String {
    pem.lines().map(str::trim).filter(|line| !line.is_empty() && !line.starts_with("-----")).collect()
}
