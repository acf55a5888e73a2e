use backend_lib::auth::{verify_password, PasswordVerifier};
use backend_lib::config::{KdfAlgorithm, KdfSettings};

fn cheap(algorithm: KdfAlgorithm) -> KdfSettings {
    KdfSettings {
        algorithm,
        scrypt_log_n: 4,
        argon2_m_cost: 64,
        argon2_t_cost: 1,
        ..KdfSettings::default()
    }
}

#[test]
fn test_hashes_from_either_kdf_verify_anywhere() {
    let scrypt = PasswordVerifier::new(&cheap(KdfAlgorithm::Scrypt)).unwrap();
    let argon2 = PasswordVerifier::new(&cheap(KdfAlgorithm::Argon2id)).unwrap();

    let argon2_hash = argon2.hash("correct-horse").unwrap();
    let scrypt_hash = scrypt.hash("correct-horse").unwrap();

    // stored hashes outlive a change of the configured algorithm
    assert!(scrypt.verify("correct-horse", &argon2_hash));
    assert!(argon2.verify("correct-horse", &scrypt_hash));
    assert!(!scrypt.verify("wrong", &argon2_hash));
    assert!(!argon2.verify("wrong", &scrypt_hash));
}

#[test]
fn test_hash_carries_its_parameters() {
    let scrypt = PasswordVerifier::new(&cheap(KdfAlgorithm::Scrypt)).unwrap();
    let hash = scrypt.hash("correct-horse").unwrap();
    assert!(hash.starts_with("$scrypt$"), "{hash}");
    assert!(hash.contains("ln=4"), "{hash}");

    // a verifier configured with a different cost still checks it
    let mut costlier = cheap(KdfAlgorithm::Scrypt);
    costlier.scrypt_log_n = 5;
    let other = PasswordVerifier::new(&costlier).unwrap();
    assert!(other.verify("correct-horse", &hash));
}

#[test]
fn test_verify_password_never_panics_on_garbage() {
    for stored in ["", "$", "$$$$", "$scrypt$", "$argon2id$v=19$m=1,t=1,p=1$$", "🦀"] {
        assert!(!verify_password(stored, "anything"), "{stored}");
    }
}

#[test]
fn test_empty_password_hashes_but_does_not_match_others() {
    let scrypt = PasswordVerifier::new(&cheap(KdfAlgorithm::Scrypt)).unwrap();
    let hash = scrypt.hash("").unwrap();
    assert!(scrypt.verify("", &hash));
    assert!(!scrypt.verify(" ", &hash));
}
