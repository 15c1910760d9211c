//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **SessionProvider**: 現在の principal の追跡
//! - **Accounts**: sign-up / sign-in / sign-out（sign-up 時に profile 行を作る）
//! - **ProfileSync**: アバター取得と pick → upload → link ワークフロー
//! - **AuthForm / ProfileScreen**: 画面の状態とユーザー向け通知

pub mod accounts;
pub mod auth_form;
pub mod builder;
pub mod notice;
pub mod profile_screen;
pub mod profile_sync;
pub mod profiles;
pub mod session;

// 主要な型を再エクスポート
pub use self::accounts::Accounts;
pub use self::auth_form::{AuthForm, AuthMode};
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::notice::{NoticeLevel, UserNotice};
pub use self::profile_screen::{FollowHandle, ProfileScreen, ProfileView};
pub use self::profile_sync::ProfileSync;
pub use self::profiles::ProfileRepository;
pub use self::session::SessionProvider;
