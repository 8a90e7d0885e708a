pub mod pcm;
pub mod wav;
