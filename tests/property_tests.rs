//! Property-based tests for the PPM compressor.

use ppm_trie::{
    compress, decompress,
    entropy_coding::{ACReader, ACWriter},
    models::{Frozen, PpmDecoder, PpmEncoder, PpmModel},
    Error, PpmConfig,
};
use proptest::prelude::*;

/// Bytes from a small alphabet, so contexts repeat and every order gets used
fn texty(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(prop::sample::select(b"abcde \n".to_vec()), 0..max_len)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn roundtrip_random_bytes(input in proptest::collection::vec(any::<u8>(), 0..2000), order in 1usize..=8) {
        let config = PpmConfig::with_order(order);
        let compressed = compress(&input, &config).unwrap();
        prop_assert_eq!(decompress(&compressed, &config).unwrap(), input);
    }

    #[test]
    fn roundtrip_small_alphabet(input in texty(4000), order in 1usize..=12) {
        let config = PpmConfig::with_order(order);
        let compressed = compress(&input, &config).unwrap();
        prop_assert_eq!(decompress(&compressed, &config).unwrap(), input);
    }

    #[test]
    fn compression_is_deterministic(input in texty(1000), order in 1usize..=6) {
        let config = PpmConfig::with_order(order);
        prop_assert_eq!(compress(&input, &config).unwrap(), compress(&input, &config).unwrap());
    }

    #[test]
    fn unseen_bytes_fall_back_to_uniform(prefix in texty(500), novel in 128u8..=255) {
        // a byte never seen before must still be coded, through every escape down to order 0
        let mut input = prefix;
        input.push(novel);
        let config = PpmConfig::with_order(4);
        let compressed = compress(&input, &config).unwrap();
        prop_assert_eq!(decompress(&compressed, &config).unwrap(), input);
    }

    #[test]
    fn truncated_streams_terminate(input in texty(2000), keep in 0.0f64..1.0) {
        let config = PpmConfig::with_order(4);
        let compressed = compress(&input, &config).unwrap();
        let cut = &compressed[..(compressed.len() as f64 * keep) as usize];
        // a cut that keeps enough bits to reach EOF may still decode, but it never runs on
        if let Err(err) = decompress(cut, &config) {
            prop_assert!(matches!(err, Error::CorruptStream), "{}", err);
        }
    }

    #[test]
    fn encoder_and_decoder_models_stay_in_sync(input in texty(1500)) {
        let config = PpmConfig::with_order(5);
        let mut enc_model = PpmModel::new(config).unwrap();
        let mut encoder = PpmEncoder::new(&mut enc_model, ACWriter::new(Vec::new()));
        encoder.encode_all(&input).unwrap();
        let compressed = encoder.finish().unwrap().into_inner();

        let mut dec_model = PpmModel::new(config).unwrap();
        let decoded = PpmDecoder::new(&mut dec_model, ACReader::new(compressed.as_slice()))
            .unwrap()
            .collect::<ppm_trie::Result<Vec<u8>>>()
            .unwrap();

        prop_assert_eq!(decoded, input);
        prop_assert_eq!(enc_model.node_count(), dec_model.node_count());
        let (mut a, mut b) = (Vec::new(), Vec::new());
        enc_model.dump(&mut a).unwrap();
        dec_model.dump(&mut b).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn frozen_model_round_trips(training in texty(1000), input in texty(500)) {
        let config = PpmConfig::with_order(3);
        let mut base = PpmModel::new(config).unwrap();
        let mut trainer = PpmEncoder::new(&mut base, ACWriter::new(Vec::new()));
        trainer.encode_all(&training).unwrap();
        trainer.finish().unwrap();
        base.reset_context();

        let mut enc_model = base.clone();
        let mut encoder = PpmEncoder::<_, Frozen>::with_policy(&mut enc_model, ACWriter::new(Vec::new()));
        encoder.encode_all(&input).unwrap();
        let compressed = encoder.finish().unwrap().into_inner();

        let mut dec_model = base;
        let decoded = PpmDecoder::<_, Frozen>::with_policy(&mut dec_model, ACReader::new(compressed.as_slice()))
            .unwrap()
            .collect::<ppm_trie::Result<Vec<u8>>>()
            .unwrap();
        prop_assert_eq!(decoded, input);
    }
}
