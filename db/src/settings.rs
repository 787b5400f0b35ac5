use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use torq_db_entity::{prelude::Settings as SettingsEntity, settings};
use torq_types::prelude::Settings;
use uuid::Uuid;

use crate::{
    OptTx, SINGULAR_TABLE_FIXED_ID, TorqDbGeneralModelOperations,
    db::TorqDb,
    errors::{DbSqlError, Result},
};

#[async_trait]
pub trait TorqDbSettingsOperations {
    /// Returns the installation settings.
    ///
    /// The settings row is created with defaults and a fresh installation UUID the first time.
    async fn get_settings<'a>(&'a self, tx: OptTx<'a>) -> Result<Settings>;

    /// Overwrites the settings. The installation UUID never changes.
    async fn update_settings<'a>(&'a self, tx: OptTx<'a>, settings: Settings) -> Result<()>;
}

#[async_trait]
impl TorqDbSettingsOperations for TorqDb {
    async fn get_settings<'a>(&'a self, tx: OptTx<'a>) -> Result<Settings> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    if let Some(model) = SettingsEntity::find_by_id(SINGULAR_TABLE_FIXED_ID)
                        .one(tx.as_ref())
                        .await?
                    {
                        return Ok(Settings::try_from(model)?);
                    }

                    let defaults = Settings::default();
                    let torq_uuid = Uuid::new_v4();
                    let model = settings::ActiveModel {
                        id: Set(SINGULAR_TABLE_FIXED_ID),
                        torq_uuid: Set(torq_uuid.to_string()),
                        preferred_timezone: Set(defaults.preferred_timezone),
                        default_date_range: Set(defaults.default_date_range),
                        default_language: Set(defaults.default_language),
                        week_starts_on: Set(defaults.week_starts_on),
                        vector_url: Set(Some(defaults.vector_url)),
                    }
                    .insert(tx.as_ref())
                    .await?;

                    tracing::info!(%torq_uuid, "installation settings created");
                    Ok::<_, DbSqlError>(Settings::try_from(model)?)
                })
            })
            .await
    }

    async fn update_settings<'a>(&'a self, tx: OptTx<'a>, settings: Settings) -> Result<()> {
        let myself = self.clone();
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    // creates the row when missing
                    myself.get_settings(Some(tx)).await?;

                    let mut model = SettingsEntity::find_by_id(SINGULAR_TABLE_FIXED_ID)
                        .one(tx.as_ref())
                        .await?
                        .ok_or_else(|| DbSqlError::MissingEntry("settings".into()))?
                        .into_active_model();

                    model.preferred_timezone = Set(settings.preferred_timezone);
                    model.default_date_range = Set(settings.default_date_range);
                    model.default_language = Set(settings.default_language);
                    model.week_starts_on = Set(settings.week_starts_on);
                    model.vector_url = Set(Some(settings.vector_url));
                    model.update(tx.as_ref()).await?;

                    Ok::<_, DbSqlError>(())
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settings_keep_installation_uuid() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;

        let first = db.get_settings(None).await?;
        assert!(!first.torq_uuid.is_nil());
        assert_eq!(first.vector_url, Settings::DEFAULT_VECTOR_URL);

        db.update_settings(
            None,
            Settings {
                torq_uuid: Uuid::new_v4(),
                preferred_timezone: "Europe/Zurich".into(),
                vector_url: "http://localhost:8080/".into(),
                ..first.clone()
            },
        )
        .await?;

        let second = db.get_settings(None).await?;
        assert_eq!(second.torq_uuid, first.torq_uuid);
        assert_eq!(second.preferred_timezone, "Europe/Zurich");
        assert_eq!(second.vector_url, "http://localhost:8080/");
        Ok(())
    }
}
