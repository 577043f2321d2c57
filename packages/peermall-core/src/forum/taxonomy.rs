//! Planet and channel management.

use super::model::{Channel, NewChannel, NewPlanet, Planet};
use crate::error::{Error, Result};
use crate::storage::schema::{indexes, stores};

impl super::ForumService {
    /// Create a planet.
    pub async fn create_planet(&self, new: NewPlanet) -> Result<Planet> {
        let planet = new.into_record(crate::time::now());
        planet.validate()?;
        self.store().add_typed(stores::PLANETS, &planet).await?;

        tracing::info!(id = %planet.id, name = %planet.name, "Planet created");
        Ok(planet)
    }

    /// Every planet, by name.
    pub async fn get_planets(&self) -> Result<Vec<Planet>> {
        let mut planets: Vec<Planet> = self.store().get_all_typed(stores::PLANETS).await?;
        planets.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(planets)
    }

    /// Create a channel under an existing planet.
    pub async fn create_channel(&self, new: NewChannel) -> Result<Channel> {
        let channel = new.into_record(crate::time::now());
        channel.validate()?;

        let record = channel.clone();
        self.store()
            .write_transaction("create_channel", move |txn| {
                if txn.get(stores::PLANETS, &record.planet_id)?.is_none() {
                    return Err(Error::NotFound(format!("Planet '{}'", record.planet_id)));
                }
                txn.add_typed(stores::CHANNELS, &record)
            })
            .await?;

        tracing::info!(id = %channel.id, planet = %channel.planet_id, "Channel created");
        Ok(channel)
    }

    /// Channels under a planet, by name.
    pub async fn get_channels_by_planet(&self, planet_id: &str) -> Result<Vec<Channel>> {
        let mut channels: Vec<Channel> = self
            .store()
            .get_by_index_typed(stores::CHANNELS, indexes::BY_PLANET, planet_id)
            .await?;
        channels.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(channels)
    }
}
