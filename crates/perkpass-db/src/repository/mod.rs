//! SurrealDB repository implementations.

mod agreement;
mod ledger;
mod member;
mod partner;

pub use agreement::SurrealAgreementRepository;
pub use ledger::SurrealLedgerRepository;
pub use member::SurrealMemberRepository;
pub use partner::SurrealPartnerRepository;
