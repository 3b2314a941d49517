pub mod credentials;
mod orchestrator;
mod request;
mod response;
mod translate;
pub mod transport;

pub use credentials::{CommandToken, CredentialSource, EnvToken, StaticToken};
pub use orchestrator::{
    CancelToken, EditOrchestrator, EditOutcome, EditReport, EditState, Sleeper, ThreadSleeper,
};
pub use request::{
    build_payload, EditPayload, EditRequest, EncodedImage, Instance, MaskField, Parameters,
};
pub use response::decode_prediction;
pub use translate::translate_instruction;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
