pub mod bilibili;
pub mod douyin;
pub mod douyu;
pub mod huya;
pub mod twitch;
