use filmquery_core::tokenizer::{tokenize, Tokenizer, TokenizerConfig};

#[test]
fn it_emits_unigrams_then_bigrams() {
    let terms = tokenize("Star Wars: The Empire Strikes Back");
    assert_eq!(
        terms,
        vec!["star", "wars", "empire", "strikes", "star wars", "wars empire", "empire strikes"]
    );
}

#[test]
fn it_filters_stopwords_and_short_tokens() {
    let terms = tokenize("The quick brown fox and a lazy dog");
    assert!(!terms.contains(&"the".to_string()));
    assert!(!terms.contains(&"and".to_string()));
    assert!(!terms.contains(&"a".to_string()));
    assert!(terms.contains(&"quick brown".to_string()));
}

#[test]
fn it_keeps_digits_and_accented_letters() {
    let terms = tokenize("Amélie 2");
    assert_eq!(terms, vec!["amélie"]);
    assert_eq!(tokenize("Apollo 13"), vec!["apollo", "13", "apollo 13"]);
}

#[test]
fn bigrams_can_be_disabled() {
    let t = Tokenizer::new(TokenizerConfig { bigrams: false, ..Default::default() });
    assert_eq!(t.terms(Some("Great Escape")), vec!["great", "escape"]);
}
