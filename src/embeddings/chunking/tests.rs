use super::*;

fn numbered_words(count: usize) -> String {
    (0..count)
        .map(|i| format!("w{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn default_window_and_stride() {
    let config = ChunkingConfig::default();
    assert_eq!(config.window_words(), 384);
    assert_eq!(config.overlap_words(), 38);
    assert_eq!(config.stride_words(), 346);
}

#[test]
fn token_conversion_matches_float_floor_division() {
    assert_eq!(tokens_to_words(13), 9);
    assert_eq!(tokens_to_words(12), 9);
    assert_eq!(tokens_to_words(500), 384);
    assert_eq!(tokens_to_words(1), 0);
    assert_eq!(tokens_to_words(0), 0);
}

#[test]
fn thousand_words_with_defaults() {
    let chunker = Chunker::new(&ChunkingConfig::default()).expect("valid config");
    let chunks = chunker.chunk(&numbered_words(1000));

    assert_eq!(chunks.len(), 3);

    assert_eq!((chunks[0].start_word, chunks[0].end_word), (0, 384));
    assert_eq!((chunks[1].start_word, chunks[1].end_word), (346, 730));
    assert_eq!((chunks[2].start_word, chunks[2].end_word), (692, 1000));

    assert_eq!(chunks[0].word_count, 384);
    assert_eq!(chunks[2].word_count, 308);
    assert!(chunks[1].text.starts_with("w346 w347"));
    assert!(chunks[2].text.ends_with("w999"));
}

#[test]
fn chunk_ids_are_dense() {
    let chunker = Chunker::new(&ChunkingConfig {
        chunk_size_tokens: 13,
        chunk_overlap_tokens: 3,
    })
    .expect("valid config");

    let chunks = chunker.chunk(&numbered_words(50));
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_id, i);
    }
}

#[test]
fn every_word_is_covered() {
    let chunker = Chunker::new(&ChunkingConfig {
        chunk_size_tokens: 26,
        chunk_overlap_tokens: 5,
    })
    .expect("valid config");
    let total = 137;
    let chunks = chunker.chunk(&numbered_words(total));

    let mut covered = vec![false; total];
    for chunk in &chunks {
        assert_eq!(chunk.word_count, chunk.end_word - chunk.start_word);
        for flag in &mut covered[chunk.start_word..chunk.end_word] {
            *flag = true;
        }
    }
    assert!(covered.iter().all(|&c| c));
    assert_eq!(chunks.last().map(|c| c.end_word), Some(total));
}

#[test]
fn short_text_is_single_chunk() {
    let chunker = Chunker::new(&ChunkingConfig::default()).expect("valid config");
    let chunks = chunker.chunk("  Hello\n\tworld  again ");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "Hello world again");
    assert_eq!(chunks[0].word_count, 3);
}

#[test]
fn empty_and_whitespace_text_yield_nothing() {
    let chunker = Chunker::new(&ChunkingConfig::default()).expect("valid config");
    assert!(chunker.chunk("").is_empty());
    assert!(chunker.chunk(" \n\t  ").is_empty());
}

#[test]
fn invalid_configs_are_rejected() {
    let equal = ChunkingConfig {
        chunk_size_tokens: 50,
        chunk_overlap_tokens: 50,
    };
    assert!(matches!(
        Chunker::new(&equal),
        Err(ConfigError::InvalidChunkSizes {
            size: 50,
            overlap: 50
        })
    ));

    let inverted = ChunkingConfig {
        chunk_size_tokens: 10,
        chunk_overlap_tokens: 20,
    };
    assert!(inverted.validate().is_err());

    // 13 and 12 tokens both map to 9 words, so the window never advances
    let stalled = ChunkingConfig {
        chunk_size_tokens: 13,
        chunk_overlap_tokens: 12,
    };
    assert_eq!(stalled.stride_words(), 0);
    assert!(stalled.validate().is_err());

    let zero_window = ChunkingConfig {
        chunk_size_tokens: 1,
        chunk_overlap_tokens: 0,
    };
    assert!(zero_window.validate().is_err());
}

#[test]
fn chunk_serializes_with_field_names() {
    let chunk = Chunk {
        text: "alpha beta".to_string(),
        chunk_id: 0,
        start_word: 0,
        end_word: 2,
        word_count: 2,
    };
    let json = serde_json::to_value(&chunk).expect("serialize");
    assert_eq!(json["chunk_id"], 0);
    assert_eq!(json["word_count"], 2);
    assert_eq!(json["text"], "alpha beta");
}
