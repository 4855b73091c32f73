/*!
 * Tests for prompt construction
 */

use ibut::engine::prompts::{build_prompt, PromptKind, PromptRequest};
use ibut::engine::UnderstandingPair;
use ibut::language_utils::{LanguagePair, LanguageSide};

fn all_requests<'a>(
    sentence: &'a str,
    pair: &'a LanguagePair,
    understandings: &'a UnderstandingPair,
) -> Vec<PromptRequest<'a>> {
    vec![
        PromptRequest::Understanding { side: LanguageSide::Source, sentence, pair },
        PromptRequest::Understanding { side: LanguageSide::Target, sentence, pair },
        PromptRequest::Judgment { sentence, pair, understandings },
        PromptRequest::Feedback {
            side: LanguageSide::Source,
            sentence,
            pair,
            judgment: "True",
            understanding: &understandings.source,
        },
        PromptRequest::Feedback {
            side: LanguageSide::Target,
            sentence,
            pair,
            judgment: "True",
            understanding: &understandings.target,
        },
        PromptRequest::Refinement {
            side: LanguageSide::Target,
            sentence,
            pair,
            understanding: &understandings.target,
            feedback: "feedback",
        },
        PromptRequest::Translation { sentence, pair, understandings },
    ]
}

#[test]
fn test_everyPrompt_shouldEmbedTheSentence() {
    let pair = LanguagePair::parse_direction("ger-fre").unwrap();
    let understandings = UnderstandingPair::new("Verständnis", "compréhension");
    let sentence = "Der Klimawandel ist eine der größten Herausforderungen.";

    for request in all_requests(sentence, &pair, &understandings) {
        let prompt = build_prompt(&request);
        assert!(prompt.contains(sentence), "{} prompt misses the sentence", request.kind());
        assert!(!prompt.contains("{sentence}"), "{} prompt left a placeholder", request.kind());
    }
}

#[test]
fn test_prompts_shouldUseDisplayNamesNotCodes() {
    let pair = LanguagePair::parse_direction("ger-fre").unwrap();
    let understandings = UnderstandingPair::new("S", "T");

    let judgment = build_prompt(&PromptRequest::Judgment { sentence: "x", pair: &pair, understandings: &understandings });
    assert!(judgment.contains("German and French linguist"));
    assert!(!judgment.contains("ger"));

    let translation = build_prompt(&PromptRequest::Translation { sentence: "x", pair: &pair, understandings: &understandings });
    assert!(translation.contains("into French"));
}

#[test]
fn test_buildPrompt_withBracesInModelOutput_shouldEmbedVerbatim() {
    let pair = LanguagePair::new("zh", "en").unwrap();
    let understandings = UnderstandingPair::new("uses {target_understanding} literally", "{sentence}");

    let prompt = build_prompt(&PromptRequest::Judgment { sentence: "A", pair: &pair, understandings: &understandings });

    assert!(prompt.contains("uses {target_understanding} literally"));
    assert!(prompt.contains("\n{sentence}"));
}

#[test]
fn test_buildPrompt_withEmptySentence_shouldStillRender() {
    let pair = LanguagePair::new("zh", "en").unwrap();
    let prompt = build_prompt(&PromptRequest::Understanding { side: LanguageSide::Source, sentence: "", pair: &pair });

    assert!(prompt.ends_with("source_sentence: "));
}

#[test]
fn test_kinds_shouldBeDistinctForEachRequest() {
    let pair = LanguagePair::new("zh", "en").unwrap();
    let understandings = UnderstandingPair::new("S", "T");

    let kinds: Vec<PromptKind> = all_requests("A", &pair, &understandings).iter().map(|r| r.kind()).collect();
    assert_eq!(kinds, PromptKind::ALL.to_vec());
    assert_eq!(PromptKind::SourceFeedback.template(), PromptKind::TargetFeedback.template());
}
