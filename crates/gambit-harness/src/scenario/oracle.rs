//! Oracle helpers.
//!
//! Reusable end-of-scenario checks. Each returns an [`OracleFn`]; combine
//! them with [`all_of`].

use gambit_client::SyncPhase;

use crate::scenario::{OracleFn, World};

/// Every client finished synchronising with its session.
pub fn all_synced() -> OracleFn {
    Box::new(|world: &World| {
        for (name, client) in world.clients() {
            if client.phase() != SyncPhase::Synced {
                return Err(format!("{name} is {} rather than synced", client.phase()));
            }
        }
        Ok(())
    })
}

/// Every client in a session mirrors the server's position and record.
pub fn mirrors_match_server() -> OracleFn {
    Box::new(|world: &World| {
        for (name, client) in world.clients() {
            let Some(id) = client.session() else {
                continue;
            };
            if client.phase() != SyncPhase::Synced {
                continue;
            }
            let session = world
                .network()
                .server()
                .session(id)
                .ok_or_else(|| format!("{name} is in {id}, which the server does not know"))?;
            if client.position() != session.position() {
                return Err(format!(
                    "{name} position {} differs from server {}",
                    client.position(),
                    session.position()
                ));
            }
            if client.history() != session.history() {
                return Err(format!(
                    "{name} history {:?} differs from server {:?}",
                    client.history(),
                    session.history()
                ));
            }
        }
        Ok(())
    })
}

/// No client holds more than one live channel, and a client without a
/// channel holds none.
pub fn single_channel() -> OracleFn {
    Box::new(|world: &World| {
        for (name, client) in world.clients() {
            let live = world.network().live_channels(name);
            let expected = usize::from(client.channel().is_some());
            if live > expected {
                return Err(format!("{name} has {live} live channels, expected at most {expected}"));
            }
        }
        Ok(())
    })
}

/// Every optimistic move has been confirmed by the server.
pub fn no_pending_moves() -> OracleFn {
    Box::new(|world: &World| {
        for (name, client) in world.clients() {
            if client.pending_moves() > 0 {
                return Err(format!("{name} has {} unconfirmed moves", client.pending_moves()));
            }
        }
        Ok(())
    })
}

/// All oracles must pass; the first failure is reported.
pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
    Box::new(move |world: &World| {
        for oracle in &oracles {
            oracle(world)?;
        }
        Ok(())
    })
}
