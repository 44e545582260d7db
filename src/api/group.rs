use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            group::{GroupDescription, GroupSpec},
        },
        db::{
            admin::Admin,
            group::{Group, NewGroup},
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![get_groups, get_group, create_group, delete_group]
}

#[get("/groups")]
async fn get_groups(groups: Coll<Group>) -> Result<Json<Vec<GroupDescription>>> {
    let groups: Vec<GroupDescription> = groups
        .find(None, None)
        .await?
        .map_ok(GroupDescription::from)
        .try_collect()
        .await?;
    Ok(Json(groups))
}

#[get("/groups/<group_id>")]
async fn get_group(group_id: Id, groups: Coll<Group>) -> Result<Json<GroupDescription>> {
    let group = groups
        .find_one(group_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Group with ID '{group_id}'")))?;
    Ok(Json(group.into()))
}

#[post("/admin/groups", data = "<spec>", format = "json")]
async fn create_group(
    _token: AuthToken<Admin>,
    spec: Json<GroupSpec>,
    new_groups: Coll<NewGroup>,
    groups: Coll<Group>,
) -> Result<Json<GroupDescription>> {
    let group: NewGroup = spec.0.try_into()?;
    let new_id: Id = new_groups
        .insert_one(&group, None)
        .await?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::internal("Database returned a non-ObjectId key"))?
        .into();

    let group = groups
        .find_one(new_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Group with ID '{new_id}'")))?;
    info!("Created group '{}' ({})", group.name, group.id);
    Ok(Json(group.into()))
}

/// Delete a group. Its candidates and any votes in it are left alone.
#[delete("/admin/groups/<group_id>")]
async fn delete_group(_token: AuthToken<Admin>, group_id: Id, groups: Coll<Group>) -> Result<()> {
    let result = groups.delete_one(group_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("Group with ID '{group_id}'")));
    }
    info!("Deleted group {group_id}");
    Ok(())
}
