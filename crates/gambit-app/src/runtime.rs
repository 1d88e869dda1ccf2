//! Generic event loop.

use gambit_client::{Client, ClientEvent};
use gambit_core::{Environment, RulesEngine};
use tracing::{debug, info};

use crate::Driver;

/// Owns one [`Client`] and one [`Driver`] and runs the single-threaded event
/// loop between them.
///
/// ```text
/// loop {
///     event   = driver.next_event()
///     actions = client.handle(event)
///     for action in actions { driver.execute(action) }
///     driver.render(client)
/// }
/// ```
///
/// Events are processed strictly one at a time, so client state is never
/// touched concurrently.
pub struct Runtime<D, E, R>
where
    D: Driver,
    E: Environment,
    R: RulesEngine,
{
    driver: D,
    client: Client<E, R>,
}

impl<D, E, R> Runtime<D, E, R>
where
    D: Driver,
    E: Environment,
    R: RulesEngine,
{
    /// Pair a driver with a client.
    pub fn new(driver: D, client: Client<E, R>) -> Self {
        Self { driver, client }
    }

    /// The client.
    pub fn client(&self) -> &Client<E, R> {
        &self.client
    }

    /// The driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the driver, e.g. to queue input in tests.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Split into driver and client.
    pub fn into_parts(self) -> (D, Client<E, R>) {
        (self.driver, self.client)
    }

    /// Run until the driver runs out of events or a shutdown is requested,
    /// then tear down the session and stop the driver.
    ///
    /// # Errors
    ///
    /// Returns the first driver error; the driver is stopped either way.
    pub async fn run(&mut self) -> Result<(), D::Error> {
        let result = self.run_loop().await;
        let teardown = self.teardown().await;
        self.driver.stop();
        result.and(teardown)
    }

    /// Process a single event. Exposed for step-by-step simulation.
    ///
    /// # Errors
    ///
    /// Returns an error if executing an action or rendering fails.
    pub async fn step(&mut self, event: ClientEvent) -> Result<(), D::Error> {
        let actions = self.client.handle(event);
        for action in actions {
            self.driver.execute(action).await?;
        }
        self.driver.render(&self.client)
    }

    async fn run_loop(&mut self) -> Result<(), D::Error> {
        self.driver.render(&self.client)?;
        while let Some(event) = self.driver.next_event().await? {
            let shutdown = matches!(event, ClientEvent::Shutdown);
            self.step(event).await?;
            if shutdown {
                info!("shutdown requested");
                break;
            }
        }
        debug!("event loop finished");
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), D::Error> {
        for action in self.client.shutdown() {
            self.driver.execute(action).await?;
        }
        Ok(())
    }
}
