use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::controller::ControllerError;
use crate::datastore::{DataStoreError, Filter, TodoDataStore};
use crate::model::{Todo, TodoId, ValidTodo};

use super::Shared;

#[derive(Debug)]
pub enum StorageServiceRequest {
    Create(ValidTodo),
    List(Filter),
    Update(TodoId, ValidTodo),
    Complete(TodoId),
    Delete(TodoId),
}

#[derive(Debug)]
pub enum StorageServiceResponse {
    Todo(Todo),
    List(Vec<Todo>),
    Delete,
    NotFound(TodoId),
}

impl From<Result<Todo, DataStoreError>> for StorageServiceResponse {
    fn from(value: Result<Todo, DataStoreError>) -> Self {
        match value {
            Ok(todo) => StorageServiceResponse::Todo(todo),
            Err(DataStoreError::NotFound(id)) => StorageServiceResponse::NotFound(id),
        }
    }
}

impl TryFrom<StorageServiceResponse> for Todo {
    type Error = ControllerError;

    fn try_from(value: StorageServiceResponse) -> Result<Self, Self::Error> {
        match value {
            StorageServiceResponse::Todo(todo) => Ok(todo),
            StorageServiceResponse::NotFound(id) => Err(DataStoreError::NotFound(id).into()),
            _ => Err(ControllerError::StorageServiceError(
                "Wrong response".into(),
            )),
        }
    }
}

impl TryFrom<StorageServiceResponse> for Vec<Todo> {
    type Error = ControllerError;

    fn try_from(value: StorageServiceResponse) -> Result<Self, Self::Error> {
        match value {
            StorageServiceResponse::List(todos) => Ok(todos),
            _ => Err(ControllerError::StorageServiceError(
                "Wrong response".into(),
            )),
        }
    }
}

impl TryFrom<StorageServiceResponse> for () {
    type Error = ControllerError;

    fn try_from(value: StorageServiceResponse) -> Result<Self, Self::Error> {
        match value {
            StorageServiceResponse::Delete => Ok(()),
            _ => Err(ControllerError::StorageServiceError(
                "Wrong response".into(),
            )),
        }
    }
}

pub type RequestResponse = (
    StorageServiceRequest,
    oneshot::Sender<StorageServiceResponse>,
);

/// Owns all access to the datastore. Requests arrive over a channel and each one
/// holds the datastore lock for its whole read-modify-write.
pub struct StorageService<D: TodoDataStore> {
    storage: Shared<D>,
    rx: Receiver<RequestResponse>,
}

impl<D: TodoDataStore + Send + Sync + 'static> StorageService<D> {
    pub fn new(storage: Shared<D>, rx: Receiver<RequestResponse>) -> Self {
        Self { storage, rx }
    }

    pub fn build_runtime(self) -> Result<Runtime, ControllerError> {
        let runtime = Builder::new_multi_thread()
            .thread_name("storage")
            .enable_all()
            .build()?;

        runtime.handle().spawn(self.start());
        Ok(runtime)
    }

    pub async fn start(mut self) {
        while let Some((request, response_sender)) = self.rx.recv().await {
            let storage = self.storage.clone();
            tokio::spawn(async move {
                let response = handle_request(storage, request).await;
                if response_sender.send(response).is_err() {
                    warn!("storage response receiver dropped");
                }
            });
        }
        debug!("storage service channel closed");
    }
}

async fn handle_request<D: TodoDataStore>(
    storage: Shared<D>,
    request: StorageServiceRequest,
) -> StorageServiceResponse {
    match request {
        StorageServiceRequest::Create(todo) => {
            StorageServiceResponse::Todo(storage.write().await.add(todo))
        }
        StorageServiceRequest::List(filter) => {
            StorageServiceResponse::List(storage.read().await.items(&filter))
        }
        StorageServiceRequest::Update(id, changes) => {
            storage.write().await.update(id, changes).into()
        }
        StorageServiceRequest::Complete(id) => storage.write().await.complete(id).into(),
        StorageServiceRequest::Delete(id) => {
            storage.write().await.remove(id);
            StorageServiceResponse::Delete
        }
    }
}

pub async fn send<T>(
    tx_storage: Sender<RequestResponse>,
    request: StorageServiceRequest,
) -> Result<T, ControllerError>
where
    T: TryFrom<StorageServiceResponse, Error = ControllerError>,
{
    let (req_sender, callback) = oneshot::channel();
    tx_storage
        .send((request, req_sender))
        .await
        .map_err(|err| ControllerError::StorageServiceError(err.to_string()))?;

    let res = callback
        .await
        .map_err(|err| ControllerError::StorageServiceError(err.to_string()))?;
    T::try_from(res)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use tokio::sync::{mpsc::channel, RwLock};

    use crate::datastore::MemoryTodoStore;

    use super::*;

    fn named(name: &str) -> ValidTodo {
        ValidTodo {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_handle_storage_service_request() {
        // GIVEN
        let ds_cont = Arc::new(RwLock::new(MemoryTodoStore::new()));
        let (tx_storage, rx_storage) = channel::<RequestResponse>(32);
        let storage_service = StorageService::new(ds_cont.clone(), rx_storage);

        tokio::spawn(async move {
            storage_service.start().await;
        });

        // WHEN
        let first: Todo = send(
            tx_storage.clone(),
            StorageServiceRequest::Create(named("first")),
        )
        .await
        .unwrap();
        let second: Todo = send(
            tx_storage.clone(),
            StorageServiceRequest::Create(named("second")),
        )
        .await
        .unwrap();

        // THEN
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let todos: Vec<Todo> = send(
            tx_storage.clone(),
            StorageServiceRequest::List(Filter::pending_todos()),
        )
        .await
        .unwrap();
        assert_eq!(todos, vec![first.clone(), second.clone()]);

        let completed: Todo = send(tx_storage.clone(), StorageServiceRequest::Complete(2))
            .await
            .unwrap();
        assert!(completed.completed);

        let todos: Vec<Todo> = send(
            tx_storage.clone(),
            StorageServiceRequest::List(Filter::pending_todos()),
        )
        .await
        .unwrap();
        assert_eq!(todos, vec![first]);

        let () = send(tx_storage.clone(), StorageServiceRequest::Delete(1))
            .await
            .unwrap();
        let () = send(tx_storage.clone(), StorageServiceRequest::Delete(1))
            .await
            .unwrap();
        assert_eq!(ds_cont.read().await.items(&Filter::all_todos()), vec![completed]);
    }

    #[tokio::test]
    async fn test_not_found() {
        let ds_cont = Arc::new(RwLock::new(MemoryTodoStore::new()));
        let (tx_storage, rx_storage) = channel::<RequestResponse>(32);
        tokio::spawn(StorageService::new(ds_cont, rx_storage).start());

        let res: Result<Todo, _> =
            send(tx_storage.clone(), StorageServiceRequest::Complete(9)).await;
        assert!(matches!(res, Err(ControllerError::NotFound(_))));

        let res: Result<Todo, _> = send(
            tx_storage.clone(),
            StorageServiceRequest::Update(9, named("x")),
        )
        .await;
        assert!(matches!(res, Err(ControllerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_closed_service() {
        let (tx_storage, rx_storage) = channel::<RequestResponse>(1);
        drop(rx_storage);

        let res: Result<Vec<Todo>, _> = send(
            tx_storage,
            StorageServiceRequest::List(Filter::all_todos()),
        )
        .await;
        assert!(matches!(res, Err(ControllerError::StorageServiceError(_))));
    }
}
