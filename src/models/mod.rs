pub mod classification;

pub use classification::{
    find_non_empty, CardPair, CategorizeResponse, Category, CategoryFiles, ClassificationStructure,
    CreditCardGroup, CreditCardGroupResponse, DocumentGroup, DocumentGroupResponse, DocumentRef,
    CREDIT_CARDS, OTHER_DOCUMENTS,
};
