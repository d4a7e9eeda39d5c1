//! The task driver runs settlement tasks to completion, stepping each task
//! one state at a time and publishing every transition to the system bus

use std::{
    collections::HashMap,
    fmt::{Debug, Display},
};

use async_trait::async_trait;
use common::{AsyncShared, new_async_shared, types::TaskIdentifier};
use external_api::bus_message::{SystemBusMessage, task_topic};
use serde::Serialize;
use system_bus::SystemBus;
use tokio::task::JoinHandle;
use tracing::{error, info};
use util::get_current_time_millis;
use uuid::Uuid;

use crate::{settle_match::SettleMatchTaskState, submit_match::SubmitMatchTaskState};

// ------------------
// | Task and State |
// ------------------

/// The task trait defines a sequence of largely async flows, each of which
/// moves the task forward one state
///
/// The driver runs exactly one attempt: a step error ends the task, runs its
/// cleanup, and leaves any retry to an operator
#[async_trait]
pub trait Task: Send {
    /// The state type of the task, used for task introspection
    type State: Debug + Display + Send + Serialize + Into<StateWrapper>;
    /// The error type that the task may give
    type Error: Send + Debug;

    /// Get the current state of the task
    fn state(&self) -> Self::State;
    /// Whether or not the task is completed
    fn completed(&self) -> bool;
    /// Get a displayable name for the task
    fn name(&self) -> String;
    /// Take a step in the task, steps should represent largely async behavior
    async fn step(&mut self) -> Result<(), Self::Error>;
    /// A cleanup step that is run in the event of a task failure
    async fn cleanup(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Defines a wrapper that allows state objects to be stored generically
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "task_type", content = "state")]
pub enum StateWrapper {
    /// The state object for the settle match task
    SettleMatch(SettleMatchTaskState),
    /// The state object for the submit match task
    SubmitMatch(SubmitMatchTaskState),
}

impl Display for StateWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let out = match self {
            StateWrapper::SettleMatch(state) => state.to_string(),
            StateWrapper::SubmitMatch(state) => state.to_string(),
        };
        write!(f, "{out}")
    }
}

// ---------------
// | Task Driver |
// ---------------

/// Drives tasks to completion
#[derive(Clone)]
pub struct TaskDriver {
    /// The set of open tasks
    open_tasks: AsyncShared<HashMap<TaskIdentifier, StateWrapper>>,
    /// The system bus to publish task updates onto
    bus: SystemBus<SystemBusMessage>,
}

impl TaskDriver {
    /// Constructor
    pub fn new(bus: SystemBus<SystemBusMessage>) -> Self {
        Self { open_tasks: new_async_shared(HashMap::new()), bus }
    }

    /// Returns whether the given task ID is currently open
    pub async fn contains_task(&self, task_id: &TaskIdentifier) -> bool {
        self.open_tasks.read().await.contains_key(task_id)
    }

    /// Fetch the status of the requested task
    pub async fn get_task_state(&self, task_id: &TaskIdentifier) -> Option<StateWrapper> {
        self.open_tasks.read().await.get(task_id).cloned()
    }

    /// Spawn a new task in the driver
    ///
    /// Returns the ID of the task being spawned and a handle resolving to
    /// whether the task completed
    pub async fn start_task<T: Task + 'static>(
        &self,
        task: T,
    ) -> (TaskIdentifier, JoinHandle<bool>) {
        // Add the task to the bookkeeping structure
        let task_id = Uuid::new_v4();
        {
            self.open_tasks.write().await.insert(task_id, task.state().into());
        } // open_tasks lock released

        // Drive the task
        let self_clone = self.clone();
        let join_handle =
            tokio::spawn(async move { self_clone.run_task_to_completion(task_id, task).await });

        (task_id, join_handle)
    }

    /// Run a task to completion
    ///
    /// Steps the task until it completes or a step errors; there is no
    /// second attempt. A failed task runs its cleanup before the driver
    /// forgets it
    async fn run_task_to_completion<T: Task>(&self, task_id: TaskIdentifier, mut task: T) -> bool {
        let task_name = task.name();

        while !task.completed() {
            // Take a step
            if let Err(e) = task.step().await {
                error!("error executing task {task_name}({task_id}): {e:?}");
                break;
            }

            // Update the state in the registry
            let task_state = task.state();
            info!("task {task_name}({task_id}) transitioning to state {task_state}");
            {
                self.open_tasks.write().await.insert(task_id, task_state.into());
            } // open_tasks lock released

            // Publish the state to the system bus for listeners on this task
            self.bus.publish(
                task_topic(&task_id),
                SystemBusMessage::TaskStatusUpdate {
                    task_id,
                    state: task.state().to_string(),
                    timestamp: get_current_time_millis(),
                },
            );
        }

        let completed = task.completed();
        if !completed {
            if let Err(e) = task.cleanup().await {
                error!("error cleaning up task {task_name}({task_id}): {e:?}");
            }
        }

        self.open_tasks.write().await.remove(&task_id);
        completed
    }
}
