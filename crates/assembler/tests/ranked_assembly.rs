use assembly_assembler::{Assembler, AssemblyError};
use assembly_extractor::{ExtractorConfig, SignatureExtractor};
use assembly_indexer::SignatureIndex;
use assembly_retriever::Retriever;
use pretty_assertions::assert_eq;

const GAME_LIB: &str = r#"
class Bird:
    def __init__(self, x, y):
        self.x = x

    def jump(self):
        pass


class PipeManager:
    def __init__(self, width, gap_size=150):
        self.width = width

    def draw(self, screen):
        pass


def draw(screen, color: str = "white"):
    pass


def rocket_add(a: int, b: int) -> int:
    return a + b
"#;

fn index() -> SignatureIndex {
    let mut extractor = SignatureExtractor::new(ExtractorConfig::default()).unwrap();
    SignatureIndex::from_signatures(extractor.extract("game_lib.py", GAME_LIB).unwrap())
}

#[test]
fn rocket_add_with_two_arguments() {
    let index = index();
    let retrieval = Retriever::default().retrieve_line("rocket_add 100 50", &index);
    let ranked = Assembler::default()
        .assemble_ranked(&retrieval.candidates)
        .unwrap();

    assert_eq!(ranked.chosen, 0);
    assert_eq!(
        ranked.draft.code_text,
        "from game_lib import rocket_add\n\nresult = rocket_add(100, 50)\n"
    );
}

#[test]
fn rocket_add_with_one_argument_is_an_arity_error() {
    let index = index();
    let retrieval = Retriever::default().retrieve_line("rocket_add 100", &index);
    let err = Assembler::default()
        .assemble_ranked(&retrieval.candidates)
        .unwrap_err();

    match err {
        AssemblyError::NoAssemblableCandidate { errors } => {
            assert_eq!(errors.len(), 1);
            assert!(matches!(errors[0], AssemblyError::ArityError { got: 1, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn constructor_call_for_class() {
    let index = index();
    let retrieval = Retriever::default().retrieve_line("pipe manager 400", &index);
    let ranked = Assembler::default()
        .assemble_ranked(&retrieval.candidates)
        .unwrap();
    assert_eq!(
        ranked.draft.code_text,
        "from game_lib import PipeManager\n\nresult = PipeManager(400)\n"
    );
}

#[test]
fn method_candidates_fall_through_to_module_function() {
    let index = index();
    // Bird.jump is a method: no module-level candidate exists.
    let retrieval = Retriever::default().retrieve_line("jump", &index);
    assert!(Assembler::default()
        .assemble_ranked(&retrieval.candidates)
        .is_err());

    // `draw` matches the PipeManager method and the module function; the method
    // is skipped and the function is used.
    let retrieval = Retriever::default().retrieve_line("draw screen", &index);
    let ranked = Assembler::default()
        .assemble_ranked(&retrieval.candidates)
        .unwrap();
    assert_eq!(ranked.draft.signature.qualified_name(), "draw");
    assert_eq!(
        ranked.draft.code_text,
        "from game_lib import draw\n\nresult = draw(\"screen\")\n"
    );
}

#[test]
fn rejected_draft_moves_on_to_the_next_candidate() {
    let mut extractor = SignatureExtractor::new(ExtractorConfig::default()).unwrap();
    let index = SignatureIndex::from_signatures(
        extractor
            .extract(
                "math_lib.py",
                "def add_numbers(a, b):\n    pass\n\ndef add_vectors(a, b):\n    pass\n",
            )
            .unwrap(),
    );
    let retrieval = Retriever::default().retrieve_line("add 1 2", &index);

    let mut rejected = None;
    let ranked = Assembler::default()
        .assemble_ranked_checked(&retrieval.candidates, |draft| {
            if rejected.is_none() {
                rejected = Some(draft.signature.key().to_string());
                Err("did not verify".to_string())
            } else {
                Ok(())
            }
        })
        .unwrap();

    let rejected = rejected.unwrap();
    assert_eq!(ranked.chosen, 1);
    assert_ne!(ranked.draft.signature.key().to_string(), rejected);
    assert_eq!(ranked.skipped.len(), 1);
    assert_eq!(ranked.skipped[0].0, rejected);
    assert!(matches!(
        ranked.skipped[0].1,
        AssemblyError::DraftRejected { .. }
    ));
}

#[test]
fn every_draft_rejected_is_no_assemblable_candidate() {
    let index = index();
    let retrieval = Retriever::default().retrieve_line("rocket_add 1 2", &index);
    let err = Assembler::default()
        .assemble_ranked_checked(&retrieval.candidates, |_| Err("no".to_string()))
        .unwrap_err();
    assert!(err.to_string().contains("assembled call was rejected (no)"));
}
