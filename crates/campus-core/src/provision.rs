//! Role assignment and permission provisioning against a [`CampusStore`].

use tracing::info;

use crate::{
  access,
  role::{resolve_account, resolve_kind, resolve_user},
  store::CampusStore,
  user::{Account, NewAccount, NewUser, User},
};

/// Write the role derived from `user`'s variant onto `account`.
pub async fn set_role<S: CampusStore>(
  store: &S,
  user: &User,
  account: &Account,
) -> Result<Account, S::Error> {
  let binding = resolve_user(user);
  if account.role == binding.role {
    return Ok(account.clone());
  }
  info!(account = %account.account_id, from = account.role.as_str(), to = binding.role.as_str(), "role changed");
  store.update_account_role(account.account_id, binding.role).await
}

/// Converge the account's groups and its role group's permissions onto the
/// fixed plan for its role. Safe to call any number of times.
pub async fn set_permissions<S: CampusStore>(
  store: &S,
  account: &Account,
) -> Result<Account, S::Error> {
  let binding = resolve_account(account);
  let plan = access::plan(account.role);
  let account = store.apply_provisioning(account.account_id, &plan).await?;
  info!(
    account = %account.account_id,
    role = binding.tag,
    groups = ?account.groups,
    "permissions provisioned"
  );
  Ok(account)
}

/// Create a user together with its account, its role and its provisioned
/// groups. All of it is written in one store transaction.
pub async fn register_account<S: CampusStore>(
  store: &S,
  user: NewUser,
  username: String,
  password_hash: String,
) -> Result<(User, Account), S::Error> {
  let binding = resolve_kind(user.details.kind());
  let plan = access::plan(binding.role);
  let (user, account) = store
    .create_account(NewAccount { user, username, password_hash, role: binding.role }, &plan)
    .await?;
  info!(
    account = %account.account_id,
    role = binding.tag,
    groups = ?account.groups,
    "account created"
  );
  Ok((user, account))
}

/// Re-derive the role of an existing account from its user, then provision.
pub async fn reprovision<S: CampusStore>(
  store: &S,
  user: &User,
  account: &Account,
) -> Result<Account, S::Error> {
  let account = set_role(store, user, account).await?;
  set_permissions(store, &account).await
}
