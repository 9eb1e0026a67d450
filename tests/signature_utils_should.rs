use cinerelay::server::utils::signature_utils::SignatureUtil;

#[test]
fn test_signature_generation() {
    let util = SignatureUtil::new("test_secret".to_string());
    let sig1 = util.generate_signature("/movies/x.mp4", 1234567890);
    let sig2 = util.generate_signature("/movies/x.mp4", 1234567890);

    assert_eq!(sig1, sig2);
    assert_eq!(sig1.len(), 64);
}

#[test]
fn test_signature_verification() {
    let util = SignatureUtil::new("test_secret".to_string());
    let future_expiry = SignatureUtil::generate_expiry(3600);
    let path = "/movies/x.mp4";

    let signature = util.generate_signature(path, future_expiry);

    // valid signature should verify
    assert!(util.verify_signature(path, future_expiry, &signature));

    // invalid signature should fail
    assert!(!util.verify_signature(path, future_expiry, "invalid"));

    // different path or expiry should fail
    assert!(!util.verify_signature("/movies/y.mp4", future_expiry, &signature));
    assert!(!util.verify_signature(path, future_expiry + 1, &signature));

    // different secret should fail
    let other = SignatureUtil::new("other_secret".to_string());
    assert!(!other.verify_signature(path, future_expiry, &signature));
}

#[test]
fn test_expiry() {
    // a while ago
    assert!(SignatureUtil::is_expired(1234567890));
    assert!(!SignatureUtil::is_expired(SignatureUtil::generate_expiry(60)));
}

#[test]
fn test_signed_query_verifies() {
    let util = SignatureUtil::new("test_secret".to_string());
    let query = util.sign_query("/movies/x.mp4", 3600);

    let (token, expires) = query
        .split_once('&')
        .map(|(t, e)| {
            (
                t.strip_prefix("token=").unwrap().to_string(),
                e.strip_prefix("expires=").unwrap().parse::<i64>().unwrap(),
            )
        })
        .unwrap();

    assert!(util.verify_signature("/movies/x.mp4", expires, &token));
}
