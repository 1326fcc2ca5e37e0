#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use formbridge::{
    FieldErrors, FormBackend, FormController, FormOptions, FormRequest, FormValues, RequestMethod,
    SubmitResponse, TransportError, DateFormat,
};
use parking_lot::Mutex;
use tokio::sync::oneshot;

pub type ValidationReply = Result<FieldErrors, TransportError>;
pub type SubmitReply = Result<SubmitResponse, TransportError>;

type ValidationResponder = Arc<dyn Fn(&[String], &FormValues) -> ValidationReply + Send + Sync>;
type SubmitResponder = Arc<dyn Fn(&FormValues) -> SubmitReply + Send + Sync>;

/// One request received by the backend, waiting for the test to answer it.
pub struct Call<T> {
    pub fields: Vec<String>,
    pub data: FormValues,
    reply: Option<oneshot::Sender<T>>,
}

#[derive(Default)]
struct Shared {
    validation_responder: Option<ValidationResponder>,
    submit_responder: Option<SubmitResponder>,
    validations: Vec<Call<ValidationReply>>,
    submissions: Vec<Call<SubmitReply>>,
}

/// In-memory backend. Without a responder every request parks until the
/// test answers it, which makes response ordering fully controllable.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    shared: Arc<Mutex<Shared>>,
}

impl std::fmt::Debug for ScriptedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedBackend").finish_non_exhaustive()
    }
}

impl ScriptedBackend {
    pub fn manual() -> Self {
        Self::default()
    }

    pub fn answering_validation(
        self,
        responder: impl Fn(&[String], &FormValues) -> ValidationReply + Send + Sync + 'static,
    ) -> Self {
        self.shared.lock().validation_responder = Some(Arc::new(responder));
        self
    }

    pub fn answering_submit(
        self,
        responder: impl Fn(&FormValues) -> SubmitReply + Send + Sync + 'static,
    ) -> Self {
        self.shared.lock().submit_responder = Some(Arc::new(responder));
        self
    }

    pub fn validation_count(&self) -> usize {
        self.shared.lock().validations.len()
    }

    pub fn submission_count(&self) -> usize {
        self.shared.lock().submissions.len()
    }

    pub fn validated_fields(&self) -> Vec<Vec<String>> {
        self.shared
            .lock()
            .validations
            .iter()
            .map(|call| call.fields.clone())
            .collect()
    }

    pub fn validation_data(&self, index: usize) -> FormValues {
        self.shared.lock().validations[index].data.clone()
    }

    /// Answers the first unanswered validation matching `predicate`.
    pub fn reply_validation_where(
        &self,
        predicate: impl Fn(&Call<ValidationReply>) -> bool,
        reply: ValidationReply,
    ) {
        let mut shared = self.shared.lock();
        let call = shared
            .validations
            .iter_mut()
            .find(|call| call.reply.is_some() && predicate(call))
            .expect("no matching validation request");
        let sender = call.reply.take().expect("reply channel");
        let _ = sender.send(reply);
    }

    pub fn reply_validation(&self, index: usize, reply: ValidationReply) {
        let sender = self.shared.lock().validations[index]
            .reply
            .take()
            .expect("validation already answered");
        let _ = sender.send(reply);
    }

    pub fn reply_submission(&self, index: usize, reply: SubmitReply) {
        let sender = self.shared.lock().submissions[index]
            .reply
            .take()
            .expect("submission already answered");
        let _ = sender.send(reply);
    }
}

#[async_trait]
impl FormBackend for ScriptedBackend {
    async fn validate(
        &self,
        request: &FormRequest,
        fields: &[String],
    ) -> Result<FieldErrors, TransportError> {
        let receiver = {
            let mut shared = self.shared.lock();
            let responder = shared.validation_responder.clone();
            let (sender, receiver) = oneshot::channel();
            let mut call = Call {
                fields: fields.to_vec(),
                data: request.data.clone(),
                reply: Some(sender),
            };
            if let Some(responder) = responder {
                let reply = responder(fields, &request.data);
                call.reply = None;
                shared.validations.push(call);
                return reply;
            }
            shared.validations.push(call);
            receiver
        };
        receiver
            .await
            .unwrap_or_else(|_| Err(TransportError::Network("reply dropped".into())))
    }

    async fn submit(&self, request: &FormRequest) -> Result<SubmitResponse, TransportError> {
        let receiver = {
            let mut shared = self.shared.lock();
            let responder = shared.submit_responder.clone();
            let (sender, receiver) = oneshot::channel();
            let mut call = Call {
                fields: Vec::new(),
                data: request.data.clone(),
                reply: Some(sender),
            };
            if let Some(responder) = responder {
                let reply = responder(&request.data);
                call.reply = None;
                shared.submissions.push(call);
                return reply;
            }
            shared.submissions.push(call);
            receiver
        };
        receiver
            .await
            .unwrap_or_else(|_| Err(TransportError::Network("reply dropped".into())))
    }
}

pub fn contact_values() -> FormValues {
    FormValues::new()
        .with("first_name", "Ada")
        .with("last_name", "Lovelace")
        .with("email", "ada@example.com")
        .with("is_vip", true)
        .with("hourly", 95)
        .with("dob", formbridge::FieldValue::Null)
        .with("starts_on", "2024-01-15")
        .with("ends_on", "2024-01-20")
}

pub fn iso_options() -> FormOptions {
    FormOptions::default().with_date_format(DateFormat::iso())
}

pub fn contact_form(backend: &ScriptedBackend) -> FormController<ScriptedBackend> {
    contact_form_with(backend, iso_options())
}

pub fn contact_form_with(
    backend: &ScriptedBackend,
    options: FormOptions,
) -> FormController<ScriptedBackend> {
    FormController::with_options(
        "contact-form",
        RequestMethod::Post,
        "/contacts",
        contact_values(),
        backend.clone(),
        options,
    )
}

/// Lets spawned tasks run until they park on their next await.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
