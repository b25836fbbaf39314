pub mod room;
pub mod user;

pub use room::{paginate, CreateRoomRequest, ListRoomsQuery, Room, RoomView};
pub use user::{
    Account, Claims, FederatedAccount, LocalAccount, LoginRequest, PublicUser, SignupRequest,
};
