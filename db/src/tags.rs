use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Select, Set};
use torq_db_entity::{
    category,
    prelude::{Category, Tag, TaggedEntity},
    tag, tagged_entity,
};
use torq_types::prelude::{Category as CategoryEntry, Tag as TagEntry, TagTarget, TaggedEntity as TaggedEntry};

use crate::{
    OptTx, TorqDbGeneralModelOperations,
    db::TorqDb,
    errors::{DbSqlError, Result},
};

/// Defines DB API for tags, categories and their attachments to nodes and channels.
#[async_trait]
pub trait TorqDbTagOperations {
    async fn insert_category<'a>(&'a self, tx: OptTx<'a>, name: &str, style: &str) -> Result<CategoryEntry>;

    async fn get_categories<'a>(&'a self, tx: OptTx<'a>) -> Result<Vec<CategoryEntry>>;

    /// Inserts a tag, optionally placed in a category that must exist.
    async fn insert_tag<'a>(
        &'a self,
        tx: OptTx<'a>,
        name: &str,
        style: &str,
        category_id: Option<i64>,
    ) -> Result<TagEntry>;

    async fn get_tag<'a>(&'a self, tx: OptTx<'a>, tag_id: i64) -> Result<Option<TagEntry>>;

    async fn get_tags<'a>(&'a self, tx: OptTx<'a>) -> Result<Vec<TagEntry>>;

    /// Attaches the tag to its target. Returns `false` if it was already attached.
    async fn insert_tagged_entity<'a>(&'a self, tx: OptTx<'a>, entity: TaggedEntry) -> Result<bool>;

    /// Detaches the tag from its target. Returns `false` if it was not attached.
    async fn delete_tagged_entity<'a>(&'a self, tx: OptTx<'a>, entity: TaggedEntry) -> Result<bool>;

    async fn get_tagged_entities<'a>(&'a self, tx: OptTx<'a>) -> Result<Vec<TaggedEntry>>;
}

fn find_tagged(entity: &TaggedEntry) -> Select<TaggedEntity> {
    let query = TaggedEntity::find().filter(tagged_entity::Column::TagId.eq(entity.tag_id));
    match entity.target {
        TagTarget::Node(node_id) => query.filter(tagged_entity::Column::NodeId.eq(node_id)),
        TagTarget::Channel(channel_id) => query.filter(tagged_entity::Column::ChannelId.eq(channel_id)),
    }
}

#[async_trait]
impl TorqDbTagOperations for TorqDb {
    async fn insert_category<'a>(&'a self, tx: OptTx<'a>, name: &str, style: &str) -> Result<CategoryEntry> {
        let (name, style) = (name.to_string(), style.to_string());
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    let model = category::ActiveModel {
                        name: Set(name),
                        style: Set(style),
                        created_on: Set(chrono::Utc::now()),
                        ..Default::default()
                    }
                    .insert(tx.as_ref())
                    .await?;
                    Ok::<_, DbSqlError>(model.into())
                })
            })
            .await
    }

    async fn get_categories<'a>(&'a self, tx: OptTx<'a>) -> Result<Vec<CategoryEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Ok::<_, DbSqlError>(
                        Category::find()
                            .order_by_asc(category::Column::CategoryId)
                            .all(tx.as_ref())
                            .await?
                            .into_iter()
                            .map(CategoryEntry::from)
                            .collect(),
                    )
                })
            })
            .await
    }

    async fn insert_tag<'a>(
        &'a self,
        tx: OptTx<'a>,
        name: &str,
        style: &str,
        category_id: Option<i64>,
    ) -> Result<TagEntry> {
        let (name, style) = (name.to_string(), style.to_string());
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    if let Some(category_id) = category_id {
                        if Category::find_by_id(category_id).one(tx.as_ref()).await?.is_none() {
                            return Err(DbSqlError::MissingEntry(format!("category {category_id}")));
                        }
                    }

                    let model = tag::ActiveModel {
                        name: Set(name),
                        style: Set(style),
                        category_id: Set(category_id),
                        created_on: Set(chrono::Utc::now()),
                        ..Default::default()
                    }
                    .insert(tx.as_ref())
                    .await?;
                    Ok::<_, DbSqlError>(model.into())
                })
            })
            .await
    }

    async fn get_tag<'a>(&'a self, tx: OptTx<'a>, tag_id: i64) -> Result<Option<TagEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Ok::<_, DbSqlError>(Tag::find_by_id(tag_id).one(tx.as_ref()).await?.map(TagEntry::from))
                })
            })
            .await
    }

    async fn get_tags<'a>(&'a self, tx: OptTx<'a>) -> Result<Vec<TagEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    Ok::<_, DbSqlError>(
                        Tag::find()
                            .order_by_asc(tag::Column::TagId)
                            .all(tx.as_ref())
                            .await?
                            .into_iter()
                            .map(TagEntry::from)
                            .collect(),
                    )
                })
            })
            .await
    }

    async fn insert_tagged_entity<'a>(&'a self, tx: OptTx<'a>, entity: TaggedEntry) -> Result<bool> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    if find_tagged(&entity).one(tx.as_ref()).await?.is_some() {
                        return Ok(false);
                    }

                    let (node_id, channel_id) = match entity.target {
                        TagTarget::Node(node_id) => (Some(node_id), None),
                        TagTarget::Channel(channel_id) => (None, Some(channel_id)),
                    };
                    tagged_entity::ActiveModel {
                        tag_id: Set(entity.tag_id),
                        node_id: Set(node_id),
                        channel_id: Set(channel_id),
                        created_on: Set(chrono::Utc::now()),
                        ..Default::default()
                    }
                    .insert(tx.as_ref())
                    .await?;

                    Ok::<_, DbSqlError>(true)
                })
            })
            .await
    }

    async fn delete_tagged_entity<'a>(&'a self, tx: OptTx<'a>, entity: TaggedEntry) -> Result<bool> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    match find_tagged(&entity).one(tx.as_ref()).await? {
                        Some(model) => {
                            model.delete(tx.as_ref()).await?;
                            Ok::<_, DbSqlError>(true)
                        }
                        None => Ok(false),
                    }
                })
            })
            .await
    }

    async fn get_tagged_entities<'a>(&'a self, tx: OptTx<'a>) -> Result<Vec<TaggedEntry>> {
        self.nest_transaction(tx)
            .await?
            .perform(|tx| {
                Box::pin(async move {
                    TaggedEntity::find()
                        .order_by_asc(tagged_entity::Column::Id)
                        .all(tx.as_ref())
                        .await?
                        .into_iter()
                        .map(|m| TaggedEntry::try_from(m).map_err(DbSqlError::from))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use torq_types::prelude::{Chain, Network};

    use super::*;
    use crate::nodes::TorqDbNodeOperations;

    #[tokio::test]
    async fn test_tag_must_reference_existing_category() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;

        let category = db.insert_category(None, "peers", "primary").await?;
        let tag = db.insert_tag(None, "exchange", "warning", Some(category.category_id)).await?;
        assert_eq!(tag.category_id, Some(category.category_id));

        assert!(matches!(
            db.insert_tag(None, "sink", "error", Some(category.category_id + 1)).await,
            Err(DbSqlError::MissingEntry(_))
        ));
        assert_eq!(db.get_tags(None).await?, vec![tag]);
        Ok(())
    }

    #[tokio::test]
    async fn test_tagged_entity_attach_and_detach() -> anyhow::Result<()> {
        let db = TorqDb::new_in_memory().await?;
        let node = db
            .get_or_create_node(None, &format!("02{}", "9".repeat(64)), Chain::Bitcoin, Network::MainNet)
            .await?;
        let tag = db.insert_tag(None, "source", "success", None).await?;

        let entity = TaggedEntry {
            tag_id: tag.tag_id,
            target: TagTarget::Node(node.node_id),
        };

        assert!(db.insert_tagged_entity(None, entity).await?);
        assert!(!db.insert_tagged_entity(None, entity).await?);
        assert_eq!(db.get_tagged_entities(None).await?, vec![entity]);

        assert!(db.delete_tagged_entity(None, entity).await?);
        assert!(!db.delete_tagged_entity(None, entity).await?);
        assert!(db.get_tagged_entities(None).await?.is_empty());
        Ok(())
    }
}
