//! RDS database instances.

use serde_json::{json, Value};

use strato_core::{CoreResult, Resource, SecretValue, Stack};

use crate::ec2::VpcHandle;

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatabaseEngine {
    #[default]
    Postgres,
    Mysql,
}

impl DatabaseEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseEngine::Postgres => "postgres",
            DatabaseEngine::Mysql => "mysql",
        }
    }

    pub fn default_port(&self) -> i64 {
        match self {
            DatabaseEngine::Postgres => 5432,
            DatabaseEngine::Mysql => 3306,
        }
    }
}

/// Properties for a database instance.
#[derive(Debug, Clone)]
pub struct DatabaseInstanceProps {
    pub engine: DatabaseEngine,
    pub instance_identifier: String,
    pub database_name: String,
    pub master_username: String,
    pub master_user_password: SecretValue,
    pub instance_class: String,
    pub allocated_storage_gb: u32,
    pub backup_retention_days: u32,
    pub security_group_ids: Vec<Value>,
}

/// Handle to a database instance.
#[derive(Debug, Clone)]
pub struct DatabaseInstanceHandle {
    pub logical_id: String,
}

impl DatabaseInstanceHandle {
    pub fn endpoint_address(&self) -> Value {
        Stack::get_att(&self.logical_id, "Endpoint.Address")
    }

    pub fn endpoint_port(&self) -> Value {
        Stack::get_att(&self.logical_id, "Endpoint.Port")
    }
}

pub struct DatabaseInstance;

impl DatabaseInstance {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        vpc: &VpcHandle,
        props: DatabaseInstanceProps,
    ) -> CoreResult<DatabaseInstanceHandle> {
        let subnet_group_id = format!("{}SubnetGroup", id);
        stack.add_resource(
            &subnet_group_id,
            Resource::new("AWS::RDS::DBSubnetGroup")
                .prop(
                    "DBSubnetGroupDescription",
                    json!(format!("Subnets for {}", props.instance_identifier)),
                )
                .prop("SubnetIds", json!(vpc.private_subnet_ids)),
        )?;

        stack.add_resource(
            id,
            Resource::new("AWS::RDS::DBInstance")
                .prop("Engine", json!(props.engine.as_str()))
                .prop("DBInstanceIdentifier", json!(props.instance_identifier))
                .prop("DBName", json!(props.database_name))
                .prop("MasterUsername", json!(props.master_username))
                .prop("MasterUserPassword", props.master_user_password.render())
                .prop("DBInstanceClass", json!(props.instance_class))
                .prop("AllocatedStorage", json!(props.allocated_storage_gb.to_string()))
                .prop("BackupRetentionPeriod", json!(props.backup_retention_days))
                .prop("DBSubnetGroupName", Stack::r#ref(&subnet_group_id))
                .prop("VPCSecurityGroups", json!(props.security_group_ids))
                .prop("Port", json!(props.engine.default_port().to_string())),
        )?;

        Ok(DatabaseInstanceHandle {
            logical_id: id.to_string(),
        })
    }
}
