use crate::client::ChatClient;
use crate::model::GenerationProvider;
use std::sync::Arc;

pub(crate) struct ServerState<P: GenerationProvider> {
    client: Arc<ChatClient<P>>,
}

impl<P: GenerationProvider> ServerState<P> {
    pub(crate) fn new(client: Arc<ChatClient<P>>) -> Self {
        Self { client }
    }

    pub(crate) fn client(&self) -> Arc<ChatClient<P>> {
        Arc::clone(&self.client)
    }
}
